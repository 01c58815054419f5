#![no_std]
#![deny(unsafe_code)]

//! # SYSD Core
//!
//! Core types, traits, and abstractions shared by the competition system
//! daemon and the hot/cold image handshake. This crate describes the
//! competition status signal, the user program phases, the RTOS task model
//! and the interfaces of the external collaborators (status source, RTOS,
//! device layer) without depending on any of them.

use core::fmt;

pub mod phase;
pub mod port;
pub mod status;
pub mod task;
pub mod time;

pub use phase::*;
pub use port::*;
pub use status::*;
pub use task::*;
pub use time::*;

/// SYSD core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the system daemon
pub type SysdResult<T> = Result<T, SysdError>;

/// Error types for system daemon operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysdError {
    /// The static task slot already hosts a live task
    SlotBusy,
    /// The RTOS refused to create a task
    SpawnFailed,
    /// The task handle does not name a task known to the RTOS
    NoSuchTask,
    /// Priority outside the RTOS priority range
    InvalidPriority,
    /// Periodic interval of zero ticks
    InvalidPeriod,
}

impl fmt::Display for SysdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysdError::SlotBusy => write!(f, "Static task slot is already in use"),
            SysdError::SpawnFailed => write!(f, "Task creation failed"),
            SysdError::NoSuchTask => write!(f, "No such task"),
            SysdError::InvalidPriority => write!(f, "Invalid task priority"),
            SysdError::InvalidPeriod => write!(f, "Period must be at least one tick"),
        }
    }
}

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
impl std::error::Error for SysdError {}

#[cfg(feature = "defmt")]
impl defmt::Format for SysdError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SysdError::SlotBusy => defmt::write!(fmt, "SlotBusy"),
            SysdError::SpawnFailed => defmt::write!(fmt, "SpawnFailed"),
            SysdError::NoSuchTask => defmt::write!(fmt, "NoSuchTask"),
            SysdError::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            SysdError::InvalidPeriod => defmt::write!(fmt, "InvalidPeriod"),
        }
    }
}
