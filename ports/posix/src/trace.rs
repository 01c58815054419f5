//! Shared event log of the simulation.
//!
//! The simulated RTOS and device layer append to the same [`Trace`], so tests
//! can check the relative order of scheduler and device calls.

use std::sync::{Arc, Mutex, MutexGuard};

use sysd_core::{Millis, TaskHandle, TaskPriority};

/// Something the simulation observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Spawned {
        task: TaskHandle,
        name: &'static str,
        priority: TaskPriority,
    },
    Deleted(TaskHandle),
    /// A task body started running
    Ran(TaskHandle),
    /// A task body returned
    Returned(TaskHandle),
    Delay(u32),
    /// `delay_until` woke at the given time
    DelayUntil(Millis),
    Notified(TaskHandle),
    NotifyTaken(bool),
    SuspendAll,
    ResumeAll,
    TakeAll,
    GiveAll,
    FlushOutput,
    ServiceHardware,
    Housekeeping,
}

impl SimEvent {
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            SimEvent::TakeAll
                | SimEvent::GiveAll
                | SimEvent::FlushOutput
                | SimEvent::ServiceHardware
                | SimEvent::Housekeeping
        )
    }
}

/// Cloneable handle to an event log
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: SimEvent) {
        log::trace!("sim: {:?}", event);
        self.lock().push(event);
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: SimEvent) -> bool {
        self.lock().contains(&event)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SimEvent>> {
        // A panicking test thread must not hide the log from the others.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
