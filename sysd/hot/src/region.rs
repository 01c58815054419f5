//! The link-layout region and the handshake over it.
//!
//! All raw memory access to the signature slot and the table goes through
//! [`HotRegion`]. A region is consumed either by the cold side
//! ([`HotRegion::handshake`]) or by the hot side
//! ([`install_hot_table`](crate::install_hot_table)), so there is exactly one
//! writer.

use core::cell::{Cell, UnsafeCell};
use core::ptr;

use critical_section::Mutex;
use log::{debug, info, warn};

use crate::{BuildInfo, HotTable, MagicSignature};

/// Storage at a link-layout address, only reached through [`HotRegion`]
#[repr(transparent)]
struct LinkSlot<T>(UnsafeCell<T>);

#[allow(unsafe_code)]
unsafe impl<T> Sync for LinkSlot<T> {}

/// Signature slot reserved by the link layout
#[cfg_attr(target_os = "none", link_section = ".hot_magic")]
#[used]
static HOT_MAGIC: LinkSlot<MagicSignature> = LinkSlot(UnsafeCell::new(MagicSignature::BLANK));

/// Table reserved by the link layout
#[cfg_attr(target_os = "none", link_section = ".hot_table")]
#[used]
static HOT_TABLE: LinkSlot<HotTable> = LinkSlot(UnsafeCell::new(HotTable::EMPTY));

/// Whether the linked region has been handed out
static LINKED_TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Exclusive access to a signature slot and its table
#[derive(Debug)]
pub struct HotRegion {
    magic: *mut MagicSignature,
    table: *mut HotTable,
}

// Exclusive by construction; see `from_raw`.
#[allow(unsafe_code)]
unsafe impl Send for HotRegion {}

impl HotRegion {
    /// Claim the region placed by the link layout.
    ///
    /// Returns `None` once the region has already been claimed.
    pub fn take_linked() -> Option<Self> {
        let taken = critical_section::with(|cs| LINKED_TAKEN.borrow(cs).replace(true));
        if taken {
            return None;
        }
        Some(Self {
            magic: HOT_MAGIC.0.get(),
            table: HOT_TABLE.0.get(),
        })
    }

    /// Build a region over arbitrary memory.
    ///
    /// # Safety
    ///
    /// Both pointers must be valid for reads and writes, properly aligned,
    /// live for the rest of the program, and not be accessed through any
    /// other path while the region or the resulting [`Handshake`] exists.
    #[allow(unsafe_code)]
    pub const unsafe fn from_raw(magic: *mut MagicSignature, table: *mut HotTable) -> Self {
        Self { magic, table }
    }

    /// Current contents of the signature slot
    #[allow(unsafe_code)]
    pub fn signature(&self) -> MagicSignature {
        // Valid per construction; volatile since another image wrote it.
        unsafe { ptr::read_volatile(self.magic) }
    }

    #[allow(unsafe_code)]
    pub(crate) fn write_signature(&mut self, signature: MagicSignature) {
        unsafe { ptr::write_volatile(self.magic, signature) }
    }

    #[allow(unsafe_code)]
    pub(crate) fn write_table(&mut self, table: HotTable) {
        unsafe { ptr::write_volatile(self.table, table) }
    }

    /// Decide whether a hot image populated the table.
    ///
    /// An exact signature match trusts the table as written. Anything else
    /// zero-fills it so no stale pointer survives. Either way the table is
    /// read-only from here on.
    #[allow(unsafe_code)]
    pub fn handshake(mut self) -> Handshake {
        let signature = self.signature();
        let image = if signature.is_valid() {
            info!("hot image signature found");
            HotImage::Present
        } else {
            warn!("no hot image (signature {}), using built-in user functions", signature);
            self.write_table(HotTable::EMPTY);
            HotImage::Absent
        };

        // The region is consumed, so nothing writes the table again.
        let table: &'static HotTable = unsafe { &*self.table };
        debug!("hot table holds {} entries", table.functions.len());
        Handshake { image, table }
    }
}

/// Outcome of the signature check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotImage {
    /// Signature matched; the table comes from the hot image
    Present,
    /// Signature missing or corrupt; the table was zero-filled
    Absent,
}

#[cfg(feature = "defmt")]
impl defmt::Format for HotImage {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            HotImage::Present => defmt::write!(fmt, "Present"),
            HotImage::Absent => defmt::write!(fmt, "Absent"),
        }
    }
}

/// A verified, read-only view of the table
#[derive(Debug, Clone, Copy)]
pub struct Handshake {
    image: HotImage,
    table: &'static HotTable,
}

impl Handshake {
    pub fn image(&self) -> HotImage {
        self.image
    }

    pub fn is_hot(&self) -> bool {
        self.image == HotImage::Present
    }

    pub fn table(&self) -> &'static HotTable {
        self.table
    }

    /// Compile metadata of the hot image, if one was adopted
    pub fn build_info(&self) -> Option<BuildInfo> {
        match self.image {
            HotImage::Present => self.table.build_info(),
            HotImage::Absent => None,
        }
    }
}
