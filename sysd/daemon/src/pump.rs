//! Background I/O pump.
//!
//! One slice keeps the device layer alive: it flushes pending output,
//! services the hardware link and runs device housekeeping. The hardware
//! service call is not reentrant, so it runs with every device lock held and
//! the scheduler stopped.

use log::trace;
use sysd_core::{DeviceLayer, Rtos};

/// Every device port lock, held until dropped
#[must_use = "the locks are released as soon as the guard is dropped"]
pub struct DeviceLocks<'a, D: DeviceLayer> {
    devices: &'a D,
}

impl<'a, D: DeviceLayer> DeviceLocks<'a, D> {
    pub fn acquire(devices: &'a D) -> Self {
        devices.take_all();
        Self { devices }
    }
}

impl<D: DeviceLayer> Drop for DeviceLocks<'_, D> {
    fn drop(&mut self) {
        self.devices.give_all();
    }
}

/// Scheduler suspension, resumed when dropped
#[must_use = "the scheduler resumes as soon as the guard is dropped"]
pub struct SchedulerSuspended<'a, R: Rtos + ?Sized> {
    rtos: &'a R,
}

impl<'a, R: Rtos + ?Sized> SchedulerSuspended<'a, R> {
    pub fn enter(rtos: &'a R) -> Self {
        rtos.suspend_all();
        Self { rtos }
    }
}

impl<R: Rtos + ?Sized> Drop for SchedulerSuspended<'_, R> {
    fn drop(&mut self) {
        self.rtos.resume_all();
    }
}

/// Runs background I/O slices against a device layer
pub struct BackgroundPump<'r, R, D> {
    rtos: &'r R,
    devices: D,
}

impl<'r, R: Rtos, D: DeviceLayer> BackgroundPump<'r, R, D> {
    pub fn new(rtos: &'r R, devices: D) -> Self {
        Self { rtos, devices }
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    /// Hold every device lock for `f`
    pub fn locked<T>(&self, f: impl FnOnce() -> T) -> T {
        let _locks = DeviceLocks::acquire(&self.devices);
        f()
    }

    /// Run one slice. Bounded; never waits on anything but the device locks.
    pub fn run_slice(&self) {
        trace!("background slice");
        let _locks = DeviceLocks::acquire(&self.devices);
        self.devices.flush_output();
        {
            let _suspended = SchedulerSuspended::enter(self.rtos);
            self.devices.service_hardware();
        }
        self.devices.housekeeping();
    }
}
