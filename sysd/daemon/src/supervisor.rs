//! The competition supervisor.
//!
//! [`Supervisor::start`] brings user code up, [`Supervisor::poll`] is one
//! iteration of the steady-state loop and [`Supervisor::run`] loops it
//! forever. All mutable loop state lives in [`DaemonState`], which the
//! daemon task owns.

use heapless::HistoryBuffer;
use log::{debug, error, info};
use spin::Once;
use sysd_core::{
    CompetitionStatus, DeviceLayer, Millis, Phase, Rtos, StatusSource, SysdResult, TaskBody, TaskHandle, TaskMemory,
    TaskRole, UserTaskSlot,
};
use sysd_hot::UserFunctions;

use crate::{next_phase, BackgroundPump, DaemonConfig, Transition, UserTasks};

/// Name of the daemon task
pub const DAEMON_TASK_NAME: &str = "System Daemon";

/// Number of transitions kept in [`DaemonState::history`]
pub const HISTORY_DEPTH: usize = 8;

static USER_SLOT: UserTaskSlot = UserTaskSlot::new();
static DAEMON_SLOT: UserTaskSlot = UserTaskSlot::new();

/// Storage reserved for the user task slot
pub fn user_task_slot() -> TaskMemory {
    USER_SLOT.memory()
}

/// Storage reserved for the daemon task
pub fn daemon_task_slot() -> TaskMemory {
    DAEMON_SLOT.memory()
}

/// Loop state of a running supervisor
pub struct DaemonState {
    last_status: CompetitionStatus,
    current: Option<TaskHandle>,
    wake: Millis,
    history: HistoryBuffer<Transition, HISTORY_DEPTH>,
}

impl DaemonState {
    /// Status seen on the previous poll
    pub fn last_status(&self) -> CompetitionStatus {
        self.last_status
    }

    /// Task occupying the user slot, if creating it succeeded
    pub fn current_task(&self) -> Option<TaskHandle> {
        self.current
    }

    /// Reference time of the next wakeup
    pub fn wake(&self) -> Millis {
        self.wake
    }

    /// Most recent transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.oldest_ordered()
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.history.recent()
    }
}

/// Supervises the user task slot
pub struct Supervisor<R: 'static, D: 'static, S: 'static> {
    rtos: &'static R,
    pump: BackgroundPump<'static, R, D>,
    status: S,
    config: DaemonConfig,
    slot: TaskMemory,
    tasks: UserTasks<R>,
    launcher: Once<DaemonTask<R, D, S>>,
}

impl<R, D, S> Supervisor<R, D, S>
where
    R: Rtos + Sync + 'static,
    D: DeviceLayer + 'static,
    S: StatusSource + 'static,
{
    /// Create a supervisor for the user task slot `slot`.
    ///
    /// `users` is normally the registry published by [`sysd_hot::boot`].
    pub fn new(
        rtos: &'static R,
        devices: D,
        status: S,
        users: &'static UserFunctions,
        slot: TaskMemory,
        config: DaemonConfig,
    ) -> Self {
        Self {
            rtos,
            pump: BackgroundPump::new(rtos, devices),
            status,
            config,
            slot,
            tasks: UserTasks::new(users, rtos),
            launcher: Once::new(),
        }
    }

    /// Create a supervisor on the reserved [`user_task_slot`]
    pub fn with_reserved_slot(
        rtos: &'static R,
        devices: D,
        status: S,
        users: &'static UserFunctions,
        config: DaemonConfig,
    ) -> Self {
        Self::new(rtos, devices, status, users, user_task_slot(), config)
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn pump(&self) -> &BackgroundPump<'static, R, D> {
        &self.pump
    }

    /// Bring user code up. Must run on the daemon task.
    ///
    /// Holds the device locks for the startup hold, starts user
    /// `initialize` in the slot and keeps the device layer serviced until it
    /// reports back. If it never does, this never returns.
    pub fn start(&'static self) -> DaemonState {
        self.pump.locked(|| self.rtos.delay(self.config.startup_hold_ms));

        let daemon = self.tasks.set_daemon(self.rtos.current_task());
        debug!("daemon is {}", daemon);

        let current = self.spawn_role(TaskRole::Initialize);
        while !self.rtos.notify_take(true, self.config.period_ms) {
            self.pump.run_slice();
        }
        info!("user initialization complete");

        DaemonState {
            last_status: CompetitionStatus::UNOBSERVED,
            current,
            wake: self.rtos.millis(),
            history: HistoryBuffer::new(),
        }
    }

    /// One steady-state iteration: pump, react to the status, sleep.
    pub fn poll(&'static self, state: &mut DaemonState) {
        self.pump.run_slice();

        let status = self.status.competition_status();
        if status != state.last_status {
            let old = core::mem::replace(&mut state.last_status, status);
            match next_phase(old, status) {
                Some(phase) => self.enter(state, old, status, phase),
                None => debug!("{} -> {} stays in the current phase", old, status),
            }
        }

        self.rtos.delay_until(&mut state.wake, self.config.period_ms);
    }

    /// Start up, then poll forever
    pub fn run(&'static self) -> ! {
        let mut state = self.start();
        loop {
            self.poll(&mut state);
        }
    }

    fn enter(&'static self, state: &mut DaemonState, from: CompetitionStatus, to: CompetitionStatus, phase: Phase) {
        info!("{} -> {}: entering {}", from, to, phase);

        let replaced = match state.current.take() {
            Some(task) => self.retire(task),
            None => false,
        };
        state.current = self.spawn_role(TaskRole::Phase(phase));
        state.history.write(Transition {
            from,
            to,
            phase,
            replaced,
        });
    }

    /// Delete `task` if the RTOS can do so cleanly
    fn retire(&self, task: TaskHandle) -> bool {
        let task_state = self.rtos.task_state(task);
        if task_state.is_orderly() {
            self.rtos.delete(task);
            true
        } else {
            debug!("not deleting {} in state {:?}", task, task_state);
            false
        }
    }

    fn spawn_role(&'static self, role: TaskRole) -> Option<TaskHandle> {
        let spawned = self.rtos.spawn_static(
            self.tasks.body(role),
            self.config.phase_priority,
            role.task_name(),
            self.slot,
        );
        match spawned {
            Ok(task) => {
                debug!("started {} as {}", role.task_name(), task);
                Some(task)
            }
            Err(err) => {
                error!("failed to start {}: {}", role.task_name(), err);
                None
            }
        }
    }
}

impl<R, D, S> Supervisor<R, D, S>
where
    R: Rtos + Sync + 'static,
    D: DeviceLayer + Sync + 'static,
    S: StatusSource + Sync + 'static,
{
    /// Create the daemon task itself on `memory`.
    ///
    /// The task runs [`Supervisor::run`] at the configured daemon priority.
    pub fn spawn(&'static self, memory: TaskMemory) -> SysdResult<TaskHandle> {
        let body = self.launcher.call_once(|| DaemonTask { supervisor: self });
        let task = self
            .rtos
            .spawn_static(body, self.config.daemon_priority, DAEMON_TASK_NAME, memory)?;
        info!("{} started as {}", DAEMON_TASK_NAME, task);
        Ok(task)
    }

    /// Create the daemon task on the reserved [`daemon_task_slot`].
    ///
    /// Called once from system startup, after [`sysd_hot::boot`].
    pub fn launch(&'static self) -> SysdResult<TaskHandle> {
        self.spawn(daemon_task_slot())
    }
}

/// Body of the daemon task
pub struct DaemonTask<R: 'static, D: 'static, S: 'static> {
    supervisor: &'static Supervisor<R, D, S>,
}

impl<R, D, S> TaskBody for DaemonTask<R, D, S>
where
    R: Rtos + Sync + 'static,
    D: DeviceLayer + Sync + 'static,
    S: StatusSource + Sync + 'static,
{
    fn run(&self) {
        self.supervisor.run()
    }
}
