//! RTOS task model: handles, runtime states, priorities and static storage

use core::cell::UnsafeCell;
use core::fmt;

use crate::{SysdError, SysdResult};

/// Default stack depth of a user task, in words
pub const TASK_STACK_DEPTH_DEFAULT: usize = 0x2000;

/// Size of the RTOS static task control buffer, in words
pub const CONTROL_BLOCK_WORDS: usize = 64;

/// Opaque identifier of an RTOS task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u32);

impl TaskHandle {
    /// Wrap a raw RTOS task identifier
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw task identifier
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskHandle {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "task#{}", self.0);
    }
}

/// Runtime state of a task as reported by the RTOS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Currently executing (only ever the caller)
    Running,
    /// Scheduled, waiting for the processor
    Ready,
    /// Waiting on a delay, notification or other primitive
    Blocked,
    /// Explicitly suspended
    Suspended,
    /// Deleted; the handle is stale
    Deleted,
    /// Handle does not refer to a task
    Invalid,
}

impl TaskState {
    /// Whether a task in this state may be deleted by another task.
    ///
    /// Deleting a running task would mean deleting the caller; deleted and
    /// invalid handles must never be passed back to the RTOS.
    pub const fn is_orderly(self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Blocked | TaskState::Suspended)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TaskState::Running => defmt::write!(fmt, "Running"),
            TaskState::Ready => defmt::write!(fmt, "Ready"),
            TaskState::Blocked => defmt::write!(fmt, "Blocked"),
            TaskState::Suspended => defmt::write!(fmt, "Suspended"),
            TaskState::Deleted => defmt::write!(fmt, "Deleted"),
            TaskState::Invalid => defmt::write!(fmt, "Invalid"),
        }
    }
}

/// Type-safe RTOS task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskPriority(u8);

impl TaskPriority {
    /// Lowest priority usable by a task
    pub const MIN: TaskPriority = TaskPriority(1);

    /// Priority of ordinary user tasks
    pub const DEFAULT: TaskPriority = TaskPriority(8);

    /// Highest priority
    pub const MAX: TaskPriority = TaskPriority(16);

    /// Priority of the system daemon, just under the top of the range
    pub const DAEMON: TaskPriority = TaskPriority(Self::MAX.0 - 2);

    /// Create a new priority level
    pub fn new(priority: u8) -> SysdResult<Self> {
        if priority < Self::MIN.0 || priority > Self::MAX.0 {
            Err(SysdError::InvalidPriority)
        } else {
            Ok(TaskPriority(priority))
        }
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Priority `levels` steps below this one
    pub fn below(self, levels: u8) -> SysdResult<Self> {
        self.0
            .checked_sub(levels)
            .ok_or(SysdError::InvalidPriority)
            .and_then(Self::new)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskPriority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Statically reserved stack and control block for one task.
///
/// Placing these in a `static` lets a task be created without touching the
/// allocator. The RTOS owns the memory while a task created on it is alive.
#[repr(C, align(8))]
pub struct StaticTask<const DEPTH: usize> {
    stack: UnsafeCell<[u32; DEPTH]>,
    control: UnsafeCell<[u32; CONTROL_BLOCK_WORDS]>,
}

// The memory is only ever touched by the RTOS through `TaskMemory`.
#[allow(unsafe_code)]
unsafe impl<const DEPTH: usize> Sync for StaticTask<DEPTH> {}

impl<const DEPTH: usize> StaticTask<DEPTH> {
    /// Create zeroed task storage
    pub const fn new() -> Self {
        Self {
            stack: UnsafeCell::new([0; DEPTH]),
            control: UnsafeCell::new([0; CONTROL_BLOCK_WORDS]),
        }
    }

    /// Raw view of the storage handed to the RTOS on task creation
    pub fn memory(&'static self) -> TaskMemory {
        TaskMemory {
            stack: self.stack.get().cast(),
            depth: DEPTH,
            control: self.control.get().cast(),
        }
    }
}

/// Task storage with the default stack depth
pub type UserTaskSlot = StaticTask<TASK_STACK_DEPTH_DEFAULT>;

impl<const DEPTH: usize> Default for StaticTask<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw parts of a [`StaticTask`], as passed to the RTOS create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMemory {
    stack: *mut u32,
    depth: usize,
    control: *mut u32,
}

// Only obtainable from a `&'static StaticTask`, so the pointers stay valid.
#[allow(unsafe_code)]
unsafe impl Send for TaskMemory {}
#[allow(unsafe_code)]
unsafe impl Sync for TaskMemory {}

impl TaskMemory {
    /// Base of the stack buffer
    pub fn stack(&self) -> *mut u32 {
        self.stack
    }

    /// Stack depth in words
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Base of the control block buffer
    pub fn control(&self) -> *mut u32 {
        self.control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderly_states() {
        assert!(TaskState::Ready.is_orderly());
        assert!(TaskState::Blocked.is_orderly());
        assert!(TaskState::Suspended.is_orderly());
        assert!(!TaskState::Running.is_orderly());
        assert!(!TaskState::Deleted.is_orderly());
        assert!(!TaskState::Invalid.is_orderly());
    }

    #[test]
    fn priority_range() {
        assert!(TaskPriority::new(0).is_err());
        assert!(TaskPriority::new(17).is_err());
        assert_eq!(TaskPriority::new(8).unwrap(), TaskPriority::DEFAULT);
        assert_eq!(TaskPriority::MAX.below(2).unwrap().raw(), 14);
        assert!(TaskPriority::MIN.below(1).is_err());
    }

    #[test]
    fn static_task_memory_is_stable() {
        static SLOT: StaticTask<16> = StaticTask::new();
        let a = SLOT.memory();
        let b = SLOT.memory();
        assert_eq!(a, b);
        assert_eq!(a.depth(), 16);
        assert_ne!(a.stack(), a.control());
    }
}
