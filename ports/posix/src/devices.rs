//! Recording device layer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use sysd_core::DeviceLayer;

use crate::{SimEvent, Trace};

/// Device layer that logs every call and checks lock pairing
#[derive(Debug, Default)]
pub struct SimDevices {
    trace: Trace,
    locked: AtomicBool,
    services: AtomicU32,
}

impl SimDevices {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            ..Self::default()
        }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// The device locks are currently held
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Number of raw hardware service calls so far
    pub fn service_count(&self) -> u32 {
        self.services.load(Ordering::SeqCst)
    }
}

impl DeviceLayer for SimDevices {
    fn take_all(&self) {
        let was_locked = self.locked.swap(true, Ordering::SeqCst);
        assert!(!was_locked, "device locks taken twice");
        self.trace.record(SimEvent::TakeAll);
    }

    fn give_all(&self) {
        let was_locked = self.locked.swap(false, Ordering::SeqCst);
        assert!(was_locked, "device locks given without being taken");
        self.trace.record(SimEvent::GiveAll);
    }

    fn flush_output(&self) {
        self.trace.record(SimEvent::FlushOutput);
    }

    fn service_hardware(&self) {
        assert!(self.is_locked(), "hardware serviced without the device locks");
        self.services.fetch_add(1, Ordering::SeqCst);
        self.trace.record(SimEvent::ServiceHardware);
    }

    fn housekeeping(&self) {
        self.trace.record(SimEvent::Housekeeping);
    }
}
