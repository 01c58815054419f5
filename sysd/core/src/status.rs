//! Competition status signal

use core::fmt;

bitflags::bitflags! {
    /// Competition status bitmask reported by the field controller link.
    ///
    /// The flags toggle independently. Without `DISABLED` the robot is in
    /// driver control unless `AUTONOMOUS` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompetitionStatus: u32 {
        /// Robot outputs are disabled
        const DISABLED = 1 << 0;
        /// Autonomous period is selected
        const AUTONOMOUS = 1 << 1;
        /// Connected to competition control
        const CONNECTED = 1 << 2;
    }
}

impl CompetitionStatus {
    /// Value no status source can produce.
    ///
    /// Used as the initial "last seen" status so the first observation always
    /// differs from it.
    pub const UNOBSERVED: Self = Self::from_bits_retain(1 << 8);

    /// Interpret a raw status word, dropping unknown bits
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Check if the robot is disabled
    pub const fn is_disabled(self) -> bool {
        self.contains(Self::DISABLED)
    }

    /// Check if the autonomous period is selected
    pub const fn is_autonomous(self) -> bool {
        self.contains(Self::AUTONOMOUS)
    }

    /// Check if competition control is connected
    pub const fn is_connected(self) -> bool {
        self.contains(Self::CONNECTED)
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UNOBSERVED {
            return write!(f, "unobserved");
        }
        write!(
            f,
            "{}{}{}",
            if self.is_disabled() { "D" } else { "-" },
            if self.is_autonomous() { "A" } else { "-" },
            if self.is_connected() { "C" } else { "-" },
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CompetitionStatus {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "CompetitionStatus({=u32:b})", self.bits());
    }
}
