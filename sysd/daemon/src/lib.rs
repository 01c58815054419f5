#![no_std]
#![deny(unsafe_code)]

//! # SYSD Daemon
//!
//! The competition-mode task supervisor.
//!
//! The daemon is a high-priority task that owns a single user task slot. At
//! boot it runs the user `initialize` routine in that slot and keeps the
//! device layer serviced until initialization reports back. From then on it
//! polls the competition status once per period and, whenever the status
//! calls for a different phase, tears down the running user task and starts
//! the one for the new phase. Every period it also runs one slice of the
//! [background I/O pump](BackgroundPump).
//!
//! Scheduling, devices and the status signal are reached only through the
//! traits in [`sysd_core::port`], so the same supervisor runs on target and
//! on the host simulation in `sysd-posix`.

pub mod config;
pub mod pump;
pub mod supervisor;
pub mod tasks;
pub mod transition;

pub use config::*;
pub use pump::*;
pub use supervisor::*;
pub use tasks::*;
pub use transition::*;
