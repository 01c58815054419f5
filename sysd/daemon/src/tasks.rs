//! Bodies of the tasks started in the user task slot.
//!
//! Each [`TaskRole`] has one shim that looks up the matching user entry point
//! and calls it. The initialization shim also tells the daemon when user
//! `initialize` has returned.

use log::{debug, info};
use spin::Once;
use sysd_core::{Phase, Rtos, TaskBody, TaskHandle, TaskRole};
use sysd_hot::{Symbol, UserFunctions};

/// User symbol a role invokes
pub const fn role_symbol(role: TaskRole) -> Symbol {
    match role {
        TaskRole::Initialize => Symbol::Initialize,
        TaskRole::Phase(Phase::Init) => Symbol::CompetitionInitialize,
        TaskRole::Phase(Phase::Disabled) => Symbol::Disabled,
        TaskRole::Phase(Phase::Autonomous) => Symbol::Autonomous,
        TaskRole::Phase(Phase::OpControl) => Symbol::OpControl,
    }
}

const ROLE_COUNT: usize = 5;

const fn role_index(role: TaskRole) -> usize {
    match role {
        TaskRole::Initialize => 0,
        TaskRole::Phase(Phase::Init) => 1,
        TaskRole::Phase(Phase::Disabled) => 2,
        TaskRole::Phase(Phase::Autonomous) => 3,
        TaskRole::Phase(Phase::OpControl) => 4,
    }
}

/// Shim for one role
pub struct RoleTask<R: 'static> {
    role: TaskRole,
    tasks: &'static UserTasks<R>,
}

impl<R: Rtos + Sync + 'static> TaskBody for RoleTask<R> {
    fn run(&self) {
        let symbol = role_symbol(self.role);
        debug!("{} running {}", self.role.task_name(), symbol);
        self.tasks.users.call(symbol);

        if self.role == TaskRole::Initialize {
            match self.tasks.daemon.get() {
                Some(daemon) => {
                    info!("initialize returned, notifying {}", daemon);
                    self.tasks.rtos.notify(*daemon);
                }
                None => debug!("initialize returned with no daemon to notify"),
            }
        }
    }
}

/// The set of role shims bound to one user function registry
pub struct UserTasks<R: 'static> {
    users: &'static UserFunctions,
    rtos: &'static R,
    daemon: Once<TaskHandle>,
    bodies: Once<[RoleTask<R>; ROLE_COUNT]>,
}

impl<R: Rtos + Sync + 'static> UserTasks<R> {
    pub const fn new(users: &'static UserFunctions, rtos: &'static R) -> Self {
        Self {
            users,
            rtos,
            daemon: Once::new(),
            bodies: Once::new(),
        }
    }

    /// Record the task the initialization shim reports to.
    ///
    /// Write-once; returns the handle that is in effect.
    pub fn set_daemon(&self, daemon: TaskHandle) -> TaskHandle {
        *self.daemon.call_once(|| daemon)
    }

    /// Task body for `role`
    pub fn body(&'static self, role: TaskRole) -> &'static dyn TaskBody {
        let bodies = self.bodies.call_once(|| {
            [
                TaskRole::Initialize,
                TaskRole::Phase(Phase::Init),
                TaskRole::Phase(Phase::Disabled),
                TaskRole::Phase(Phase::Autonomous),
                TaskRole::Phase(Phase::OpControl),
            ]
            .map(|role| RoleTask { role, tasks: self })
        });
        &bodies[role_index(role)]
    }
}
