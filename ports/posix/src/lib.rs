//! Host port of the system daemon.
//!
//! Provides deterministic stand-ins for the collaborators the daemon needs on
//! target: a simulated RTOS with virtual time ([`SimRtos`]), a recording
//! device layer ([`SimDevices`]) and a scripted status source
//! ([`ScriptedStatus`]). Everything is single-threaded and reproducible,
//! which makes the simulation the fake scheduler of the daemon's tests.

use sysd_core::{SysdError, TaskHandle};
use thiserror::Error;

pub mod devices;
pub mod scheduler;
pub mod status;
pub mod trace;

pub use devices::*;
pub use scheduler::*;
pub use status::*;
pub use trace::*;

/// Errors raised by the simulation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("{0} is not a simulated task")]
    UnknownTask(TaskHandle),
    #[error("task slot is still held by {0}")]
    SlotBusy(TaskHandle),
    #[error("spawn of {0:?} refused")]
    SpawnRefused(&'static str),
}

impl From<SimError> for SysdError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::UnknownTask(_) => SysdError::NoSuchTask,
            SimError::SlotBusy(_) => SysdError::SlotBusy,
            SimError::SpawnRefused(_) => SysdError::SpawnFailed,
        }
    }
}
