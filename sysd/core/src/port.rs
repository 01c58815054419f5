//! Interfaces of the external collaborators.
//!
//! The daemon never talks to hardware, the scheduler or the field link
//! directly. A target port implements these traits on top of its RTOS and
//! device layer; the host port in `sysd-posix` implements them with a
//! deterministic simulation.

use crate::{CompetitionStatus, Millis, SysdResult, TaskHandle, TaskMemory, TaskPriority, TaskState};

/// Source of the competition status signal.
///
/// Polled by the daemon once per period (up to 500 times per second).
pub trait StatusSource {
    /// Current competition status
    fn competition_status(&self) -> CompetitionStatus;
}

/// Code executed by a task created through [`Rtos::spawn_static`]
pub trait TaskBody: Sync {
    /// Task entry point. Returning ends the task.
    fn run(&self);
}

/// Scheduler services consumed by the daemon
pub trait Rtos {
    /// Handle of the calling task
    fn current_task(&self) -> TaskHandle;

    /// Create a task on caller-provided static storage
    fn spawn_static(
        &self,
        body: &'static dyn TaskBody,
        priority: TaskPriority,
        name: &'static str,
        memory: TaskMemory,
    ) -> SysdResult<TaskHandle>;

    /// Delete a task. Only valid for tasks in an orderly state.
    fn delete(&self, task: TaskHandle);

    /// Runtime state of a task
    fn task_state(&self, task: TaskHandle) -> TaskState;

    /// Milliseconds since boot
    fn millis(&self) -> Millis;

    /// Block the caller for `ms` milliseconds
    fn delay(&self, ms: u32);

    /// Block until `*wake + period`, then advance `*wake` by `period`
    fn delay_until(&self, wake: &mut Millis, period: u32);

    /// Give a one-shot notification to a task
    fn notify(&self, task: TaskHandle);

    /// Wait up to `timeout_ms` for a notification to the caller.
    ///
    /// Returns `true` if a notification was taken.
    fn notify_take(&self, clear_on_exit: bool, timeout_ms: u32) -> bool;

    /// Stop the scheduler from switching tasks
    fn suspend_all(&self);

    /// Undo one [`Rtos::suspend_all`]
    fn resume_all(&self);
}

/// Device layer services consumed by the background I/O pump
pub trait DeviceLayer {
    /// Acquire every device port lock
    fn take_all(&self);

    /// Release every device port lock taken by [`DeviceLayer::take_all`]
    fn give_all(&self);

    /// Flush pending diagnostic/serial output
    fn flush_output(&self);

    /// Raw hardware service call. Not reentrant.
    fn service_hardware(&self);

    /// Periodic device subsystem housekeeping
    fn housekeeping(&self);
}

impl<T: StatusSource + ?Sized> StatusSource for &T {
    fn competition_status(&self) -> CompetitionStatus {
        (**self).competition_status()
    }
}

impl<T: DeviceLayer + ?Sized> DeviceLayer for &T {
    fn take_all(&self) {
        (**self).take_all()
    }

    fn give_all(&self) {
        (**self).give_all()
    }

    fn flush_output(&self) {
        (**self).flush_output()
    }

    fn service_hardware(&self) {
        (**self).service_hardware()
    }

    fn housekeeping(&self) {
        (**self).housekeeping()
    }
}
