//! Two-word signature marking a compatible hot image

use core::fmt;

/// First signature word
pub const MAGIC0: u32 = 0x5261_6368;

/// Second signature word
pub const MAGIC1: u32 = 0x8CEF_7310;

/// Contents of the signature slot shared by the cold and hot images
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicSignature {
    pub words: [u32; 2],
}

impl MagicSignature {
    /// Signature written by a compatible hot image
    pub const EXPECTED: Self = Self::new(MAGIC0, MAGIC1);

    /// Slot contents before any hot image ran
    pub const BLANK: Self = Self::new(0, 0);

    pub const fn new(word0: u32, word1: u32) -> Self {
        Self { words: [word0, word1] }
    }

    /// Both words match exactly. Anything else means "no hot image".
    pub const fn is_valid(&self) -> bool {
        self.words[0] == MAGIC0 && self.words[1] == MAGIC1
    }
}

impl fmt::Display for MagicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} {:#010x}", self.words[0], self.words[1])
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MagicSignature {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=u32:#x} {=u32:#x}", self.words[0], self.words[1]);
    }
}
