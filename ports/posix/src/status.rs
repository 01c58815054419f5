//! Scripted competition status.

use std::collections::VecDeque;
use std::sync::Mutex;

use sysd_core::{CompetitionStatus, StatusSource};

struct Script {
    current: CompetitionStatus,
    queued: VecDeque<CompetitionStatus>,
}

/// Status source driven by the test.
///
/// Each query consumes the next queued status, if any, and otherwise repeats
/// the last one.
pub struct ScriptedStatus {
    script: Mutex<Script>,
}

impl ScriptedStatus {
    pub fn new(initial: CompetitionStatus) -> Self {
        Self {
            script: Mutex::new(Script {
                current: initial,
                queued: VecDeque::new(),
            }),
        }
    }

    /// Replace the current status and drop anything queued
    pub fn set(&self, status: CompetitionStatus) {
        let mut script = self.lock();
        script.queued.clear();
        script.current = status;
    }

    /// Set the status from raw field-link bits
    pub fn set_raw(&self, bits: u32) {
        self.set(CompetitionStatus::from_raw(bits));
    }

    /// Queue statuses to be returned by the following queries
    pub fn push(&self, statuses: impl IntoIterator<Item = CompetitionStatus>) {
        self.lock().queued.extend(statuses);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ScriptedStatus {
    fn default() -> Self {
        Self::new(CompetitionStatus::empty())
    }
}

impl StatusSource for ScriptedStatus {
    fn competition_status(&self) -> CompetitionStatus {
        let mut script = self.lock();
        if let Some(next) = script.queued.pop_front() {
            script.current = next;
        }
        script.current
    }
}
