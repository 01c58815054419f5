//! Deterministic stand-in for the target RTOS.
//!
//! Time is virtual and only moves when the calling task blocks. There is one
//! thread of execution: whenever the caller blocks (`delay`, `delay_until`,
//! `notify_take`), every ready task of lower priority runs its body to
//! completion first, as a preemptive priority scheduler would let it. A body
//! that returns either ends its task or leaves it parked, see
//! [`AfterReturn`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use sysd_core::{Millis, Rtos, SysdResult, TaskBody, TaskHandle, TaskMemory, TaskPriority, TaskState};

use crate::{SimError, SimEvent, Trace};

/// Handle of the task that owns the simulation (the daemon)
pub const MAIN_TASK: TaskHandle = TaskHandle::from_raw(1);

/// What becomes of a task whose body returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterReturn {
    /// The task ends and reports `Deleted`
    Exit,
    /// The task stays alive, `Blocked`, like user code looping on delays
    Park,
}

/// Snapshot of one simulated task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: &'static str,
    pub priority: TaskPriority,
    pub state: TaskState,
}

struct SimTask {
    info: TaskInfo,
    memory: Option<TaskMemory>,
    body: Option<&'static dyn TaskBody>,
    notifications: u32,
}

impl SimTask {
    fn holds(&self, memory: &TaskMemory) -> bool {
        let live = !matches!(self.info.state, TaskState::Deleted | TaskState::Invalid);
        live && self.memory.is_some_and(|m| m.stack() == memory.stack())
    }
}

struct Sim {
    now: Millis,
    next_id: u32,
    current: TaskHandle,
    tasks: BTreeMap<TaskHandle, SimTask>,
    suspended: u32,
    /// Blocking calls left before ready tasks get to run
    deferred: u32,
    refuse_spawns: bool,
    after_return: AfterReturn,
}

impl Sim {
    fn task_mut(&mut self, task: TaskHandle) -> Result<&mut SimTask, SimError> {
        self.tasks.get_mut(&task).ok_or(SimError::UnknownTask(task))
    }

    fn spawn(
        &mut self,
        body: &'static dyn TaskBody,
        priority: TaskPriority,
        name: &'static str,
        memory: TaskMemory,
    ) -> Result<TaskHandle, SimError> {
        if self.refuse_spawns {
            return Err(SimError::SpawnRefused(name));
        }
        if let Some((holder, _)) = self.tasks.iter().find(|(_, t)| t.holds(&memory)) {
            return Err(SimError::SlotBusy(*holder));
        }

        self.next_id += 1;
        let task = TaskHandle::from_raw(self.next_id);
        self.tasks.insert(
            task,
            SimTask {
                info: TaskInfo {
                    name,
                    priority,
                    state: TaskState::Ready,
                },
                memory: Some(memory),
                body: Some(body),
                notifications: 0,
            },
        );
        Ok(task)
    }

    /// Next ready task allowed to preempt the current one
    fn next_runnable(&self) -> Option<(TaskHandle, &'static dyn TaskBody)> {
        if self.suspended > 0 {
            return None;
        }
        let ceiling = self.tasks.get(&self.current)?.info.priority;
        self.tasks
            .iter()
            .filter(|(_, t)| t.info.state == TaskState::Ready && t.info.priority < ceiling)
            .find_map(|(handle, t)| t.body.map(|body| (*handle, body)))
    }
}

/// Simulated RTOS
pub struct SimRtos {
    sim: Mutex<Sim>,
    trace: Trace,
}

impl SimRtos {
    /// Simulation whose caller is [`MAIN_TASK`], running at `priority`
    pub fn new(priority: TaskPriority) -> Self {
        Self::with_trace(priority, Trace::new())
    }

    /// Like [`SimRtos::new`], logging into an existing trace
    pub fn with_trace(priority: TaskPriority, trace: Trace) -> Self {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            MAIN_TASK,
            SimTask {
                info: TaskInfo {
                    name: "main",
                    priority,
                    state: TaskState::Running,
                },
                memory: None,
                body: None,
                notifications: 0,
            },
        );
        Self {
            sim: Mutex::new(Sim {
                now: Millis::ZERO,
                next_id: MAIN_TASK.raw(),
                current: MAIN_TASK,
                tasks,
                suspended: 0,
                deferred: 0,
                refuse_spawns: false,
                after_return: AfterReturn::Exit,
            }),
            trace,
        }
    }

    /// Leak a simulation for use as a `&'static dyn Rtos`
    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn set_after_return(&self, after_return: AfterReturn) {
        self.lock().after_return = after_return;
    }

    /// Make every following spawn fail until reset
    pub fn refuse_spawns(&self, refuse: bool) {
        self.lock().refuse_spawns = refuse;
    }

    pub fn now(&self) -> Millis {
        self.lock().now
    }

    /// Move virtual time forward without running anything
    pub fn advance(&self, ms: u32) {
        let mut sim = self.lock();
        sim.now = sim.now.add(ms);
    }

    pub fn task(&self, task: TaskHandle) -> Option<TaskInfo> {
        self.lock().tasks.get(&task).map(|t| t.info)
    }

    /// Storage `task` was created on
    pub fn task_memory(&self, task: TaskHandle) -> Option<TaskMemory> {
        self.lock().tasks.get(&task).and_then(|t| t.memory)
    }

    /// Tasks other than the caller that have not ended
    pub fn live_tasks(&self) -> Vec<TaskHandle> {
        self.lock()
            .tasks
            .iter()
            .filter(|(handle, t)| **handle != MAIN_TASK && !matches!(t.info.state, TaskState::Deleted | TaskState::Invalid))
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Force the state the RTOS reports for `task`
    pub fn set_state(&self, task: TaskHandle, state: TaskState) -> Result<(), SimError> {
        self.lock().task_mut(task)?.info.state = state;
        Ok(())
    }

    /// Keep ready tasks from running during the caller's next `calls`
    /// blocking calls, as if they were starved that long
    pub fn defer(&self, calls: u32) {
        self.lock().deferred = calls;
    }

    pub fn suspend_depth(&self) -> u32 {
        self.lock().suspended
    }

    /// Run every ready task that may preempt the caller.
    ///
    /// Returns how many bodies ran.
    pub fn run_ready(&self) -> usize {
        let mut ran = 0;
        loop {
            let (task, body, caller) = {
                let mut sim = self.lock();
                let Some((task, body)) = sim.next_runnable() else {
                    break;
                };
                let caller = std::mem::replace(&mut sim.current, task);
                if let Ok(t) = sim.task_mut(task) {
                    t.body = None;
                    t.info.state = TaskState::Running;
                }
                (task, body, caller)
            };

            self.trace.record(SimEvent::Ran(task));
            body.run();
            self.trace.record(SimEvent::Returned(task));
            ran += 1;

            let mut sim = self.lock();
            sim.current = caller;
            let after = match sim.after_return {
                AfterReturn::Exit => TaskState::Deleted,
                AfterReturn::Park => TaskState::Blocked,
            };
            if let Ok(t) = sim.task_mut(task) {
                if t.info.state == TaskState::Running {
                    t.info.state = after;
                }
            }
        }
        ran
    }

    fn lock(&self) -> MutexGuard<'_, Sim> {
        self.sim.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn assert_may_block(&self) {
        let depth = self.lock().suspended;
        assert_eq!(depth, 0, "blocking call with the scheduler suspended");
    }

    /// Let lower-priority tasks run while the caller blocks
    fn block(&self) {
        self.assert_may_block();
        {
            let mut sim = self.lock();
            if sim.deferred > 0 {
                sim.deferred -= 1;
                return;
            }
        }
        self.run_ready();
    }
}

impl Rtos for SimRtos {
    fn current_task(&self) -> TaskHandle {
        self.lock().current
    }

    fn spawn_static(
        &self,
        body: &'static dyn TaskBody,
        priority: TaskPriority,
        name: &'static str,
        memory: TaskMemory,
    ) -> SysdResult<TaskHandle> {
        let task = self.lock().spawn(body, priority, name, memory).map_err(|err| {
            debug!("sim: spawn of {} failed: {}", name, err);
            err
        })?;
        self.trace.record(SimEvent::Spawned { task, name, priority });
        Ok(task)
    }

    fn delete(&self, task: TaskHandle) {
        let state = {
            let mut sim = self.lock();
            let state = sim.tasks.get(&task).map(|t| t.info.state);
            if let Some(TaskState::Ready | TaskState::Blocked | TaskState::Suspended) = state {
                if let Ok(t) = sim.task_mut(task) {
                    t.info.state = TaskState::Deleted;
                    t.body = None;
                }
            }
            state
        };
        self.trace.record(SimEvent::Deleted(task));
        match state {
            Some(s) if s.is_orderly() => {}
            other => panic!("deleted {task} in state {other:?}"),
        }
    }

    fn task_state(&self, task: TaskHandle) -> TaskState {
        self.lock()
            .tasks
            .get(&task)
            .map_or(TaskState::Invalid, |t| t.info.state)
    }

    fn millis(&self) -> Millis {
        self.now()
    }

    fn delay(&self, ms: u32) {
        self.trace.record(SimEvent::Delay(ms));
        self.block();
        self.advance(ms);
    }

    fn delay_until(&self, wake: &mut Millis, period: u32) {
        self.block();
        let target = wake.add(period);
        {
            let mut sim = self.lock();
            if target.is_after(sim.now) {
                sim.now = target;
            }
        }
        *wake = target;
        self.trace.record(SimEvent::DelayUntil(target));
    }

    fn notify(&self, task: TaskHandle) {
        if let Ok(t) = self.lock().task_mut(task) {
            t.notifications += 1;
        }
        self.trace.record(SimEvent::Notified(task));
    }

    fn notify_take(&self, clear_on_exit: bool, timeout_ms: u32) -> bool {
        self.block();
        let taken = {
            let mut sim = self.lock();
            let current = sim.current;
            match sim.task_mut(current) {
                Ok(t) if t.notifications > 0 => {
                    t.notifications = if clear_on_exit { 0 } else { t.notifications - 1 };
                    true
                }
                _ => {
                    sim.now = sim.now.add(timeout_ms);
                    false
                }
            }
        };
        self.trace.record(SimEvent::NotifyTaken(taken));
        taken
    }

    fn suspend_all(&self) {
        self.lock().suspended += 1;
        self.trace.record(SimEvent::SuspendAll);
    }

    fn resume_all(&self) {
        {
            let mut sim = self.lock();
            assert!(sim.suspended > 0, "resume_all without suspend_all");
            sim.suspended -= 1;
        }
        self.trace.record(SimEvent::ResumeAll);
    }
}
