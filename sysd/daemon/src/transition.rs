//! Phase selection.

use core::fmt;

use sysd_core::{CompetitionStatus, Phase};

/// Select the phase to enter when the status changes from `old` to `new`.
///
/// Only meaningful when `old != new`. Returns `None` when the change must
/// not restart the user task: a change between two disabled statuses is
/// ignored, even when it toggles the connection.
///
/// Otherwise, in priority order: a connection edge that lands in a disabled
/// and connected status starts competition initialization; any disabled
/// status starts the disabled phase; the autonomous flag starts the
/// autonomous phase; anything else is driver control.
pub fn next_phase(old: CompetitionStatus, new: CompetitionStatus) -> Option<Phase> {
    if old.is_disabled() && new.is_disabled() {
        return None;
    }

    let connection_edge = old.is_connected() != new.is_connected();
    let phase = if connection_edge && new.is_disabled() && new.is_connected() {
        Phase::Init
    } else if new.is_disabled() {
        Phase::Disabled
    } else if new.is_autonomous() {
        Phase::Autonomous
    } else {
        Phase::OpControl
    };
    Some(phase)
}

/// One executed phase change, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CompetitionStatus,
    pub to: CompetitionStatus,
    pub phase: Phase,
    /// The previous user task was deleted
    pub replaced: bool,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.phase)?;
        if self.replaced {
            f.write_str(" (replaced)")?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Transition {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "{=u32:#x} -> {=u32:#x}: {} replaced={=bool}",
            self.from.bits(),
            self.to.bits(),
            self.phase,
            self.replaced
        );
    }
}
