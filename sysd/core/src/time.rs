//! Time management types and utilities

use core::fmt;

/// Millisecond timestamp from the RTOS tick counter.
///
/// The counter wraps; comparisons go through [`Millis::is_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Millis(u32);

impl Millis {
    /// Timestamp at boot
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from a raw millisecond count
    pub const fn new(ms: u32) -> Self {
        Self(ms)
    }

    /// Get the raw millisecond count
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Timestamp `ms` milliseconds later
    pub const fn add(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Milliseconds elapsed since a previous timestamp
    pub const fn elapsed_since(self, previous: Millis) -> u32 {
        self.0.wrapping_sub(previous.0)
    }

    /// Check if this timestamp is after another one (handles wraparound)
    pub const fn is_after(self, other: Millis) -> bool {
        let delta = self.0.wrapping_sub(other.0);
        delta != 0 && delta < u32::MAX / 2
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Millis {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ms", self.0);
    }
}
