//! Competition phases and user task roles

use core::fmt;

/// One of the four mutually exclusive user program phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// One-shot competition initialization, entered when competition
    /// control connects while disabled
    Init,
    /// Robot disabled
    Disabled,
    /// Autonomous period
    Autonomous,
    /// Driver control
    OpControl,
}

impl Phase {
    /// All phases, in selection priority order
    pub const ALL: [Phase; 4] = [Phase::Init, Phase::Disabled, Phase::Autonomous, Phase::OpControl];

    /// Name given to the RTOS task running this phase
    pub const fn task_name(self) -> &'static str {
        match self {
            Phase::Init => "User Comp. Init.",
            Phase::Disabled => "User Disabled",
            Phase::Autonomous => "User Autonomous",
            Phase::OpControl => "User Operator Control",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "competition_initialize"),
            Phase::Disabled => write!(f, "disabled"),
            Phase::Autonomous => write!(f, "autonomous"),
            Phase::OpControl => write!(f, "opcontrol"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Phase {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Phase::Init => defmt::write!(fmt, "Init"),
            Phase::Disabled => defmt::write!(fmt, "Disabled"),
            Phase::Autonomous => defmt::write!(fmt, "Autonomous"),
            Phase::OpControl => defmt::write!(fmt, "OpControl"),
        }
    }
}

/// What the user task slot is currently running.
///
/// At boot the slot runs the user `initialize` routine; after it completes
/// the slot only ever hosts competition phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRole {
    /// Startup user initialization
    Initialize,
    /// A competition phase
    Phase(Phase),
}

impl TaskRole {
    /// Name given to the RTOS task running this role
    pub const fn task_name(self) -> &'static str {
        match self {
            TaskRole::Initialize => "User Initialization",
            TaskRole::Phase(phase) => phase.task_name(),
        }
    }
}

impl From<Phase> for TaskRole {
    fn from(phase: Phase) -> Self {
        TaskRole::Phase(phase)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskRole {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TaskRole::Initialize => defmt::write!(fmt, "Initialize"),
            TaskRole::Phase(phase) => defmt::write!(fmt, "Phase({})", phase),
        }
    }
}
