//! Hot image side of the handshake.
//!
//! Runs first thing in the hot image's startup, before any of its own data
//! is initialized.

use log::info;

use crate::{BuildInfo, HotFunctions, HotRegion, HotTable, MagicSignature};

/// What the hot image publishes to the cold kernel
#[derive(Debug, Clone, Copy)]
pub struct HotExports {
    pub build: BuildInfo,
    pub functions: HotFunctions,
}

/// Pre-main initialization work of the hot image
pub struct HotStartup<'a> {
    /// Zero-initialized data segments (`.sbss`, `.bss`)
    pub zeroed: &'a mut [&'a mut [u8]],
    /// Static constructors, in link order (`.init_array`)
    pub constructors: &'a [extern "C" fn()],
}

impl HotStartup<'_> {
    fn run(self) {
        for segment in self.zeroed.iter_mut() {
            segment.fill(0);
        }
        for constructor in self.constructors {
            constructor();
        }
    }
}

/// Publish the hot image's table and finish its pre-main startup.
///
/// Order matters: signature, then every table entry, then the hot image's
/// own zeroed segments and constructors. Constructors may already create
/// tasks, so the table is complete before any of them runs.
pub fn install_hot_table(mut region: HotRegion, exports: &HotExports, startup: HotStartup<'_>) {
    info!("hot initializing");
    region.write_signature(MagicSignature::EXPECTED);
    region.write_table(HotTable::new(exports.build, exports.functions));
    startup.run();
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{HotImage, Symbol};
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::boxed::Box;

    static CTOR_ORDER: AtomicUsize = AtomicUsize::new(0);
    static FIRST_SEEN: AtomicUsize = AtomicUsize::new(usize::MAX);
    static SECOND_SEEN: AtomicUsize = AtomicUsize::new(usize::MAX);

    extern "C" fn first_ctor() {
        FIRST_SEEN.store(CTOR_ORDER.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
    }

    extern "C" fn second_ctor() {
        SECOND_SEEN.store(CTOR_ORDER.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
    }

    extern "C" fn user_opcontrol() {
        CTOR_ORDER.fetch_add(100, Ordering::SeqCst);
    }

    #[test]
    fn install_then_handshake_adopts_table() {
        let magic: &'static mut MagicSignature = Box::leak(Box::new(MagicSignature::BLANK));
        let table: &'static mut HotTable = Box::leak(Box::new(HotTable::EMPTY));
        let (magic, table) = (magic as *mut MagicSignature, table as *mut HotTable);

        let mut sbss = [0xAAu8; 8];
        let mut bss = [0x55u8; 32];
        let mut zeroed: [&mut [u8]; 2] = [&mut sbss, &mut bss];
        let exports = HotExports {
            build: BuildInfo {
                timestamp: c"Jan  1 2024 00:00:00",
                directory: c"/tmp/project",
            },
            functions: HotFunctions::EMPTY.with(Symbol::OpControl, user_opcontrol),
        };

        install_hot_table(
            unsafe { HotRegion::from_raw(magic, table) },
            &exports,
            HotStartup {
                zeroed: &mut zeroed,
                constructors: &[first_ctor, second_ctor],
            },
        );

        assert!(sbss.iter().all(|b| *b == 0));
        assert!(bss.iter().all(|b| *b == 0));
        assert_eq!(FIRST_SEEN.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND_SEEN.load(Ordering::SeqCst), 1);

        let handshake = unsafe { HotRegion::from_raw(magic, table) }.handshake();
        assert_eq!(handshake.image(), HotImage::Present);
        assert_eq!(
            handshake.table().functions.opcontrol.map(|f| f as usize),
            Some(user_opcontrol as usize)
        );
        assert!(handshake.table().functions.autonomous.is_none());
    }
}
