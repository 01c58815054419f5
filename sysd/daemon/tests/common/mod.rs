//! Shared rig for the supervisor tests.
//!
//! User entry points append to a per-thread call log. The simulation runs
//! every task body on the test's own thread, so parallel tests never see
//! each other's calls.

#![allow(dead_code)]

use std::cell::RefCell;

use sysd_core::{CompetitionStatus, StaticTask, TaskPriority};
use sysd_daemon::{DaemonConfig, DaemonState, Supervisor};
use sysd_hot::{
    install_hot_table, BuildInfo, HotExports, HotFunctions, HotRegion, HotStartup, HotTable, LinkageDefaults,
    MagicSignature, Symbol, UserFunctions,
};
use sysd_posix::{AfterReturn, ScriptedStatus, SimDevices, SimRtos, Trace};

thread_local! {
    static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

fn record(name: &'static str) {
    CALLS.with(|calls| calls.borrow_mut().push(name));
}

/// Drain the calling thread's user call log
pub fn take_calls() -> Vec<&'static str> {
    CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
}

macro_rules! user_fns {
    ($($name:ident => $label:literal),* $(,)?) => {
        $(
            pub extern "C" fn $name() {
                record($label);
            }
        )*
    };
}

user_fns! {
    cold_initialize => "initialize",
    cold_autonomous => "autonomous",
    cold_opcontrol => "opcontrol",
    cold_disabled => "disabled",
    cold_comp_init => "competition_initialize",
    hot_autonomous => "hot autonomous",
    hot_opcontrol => "hot opcontrol",
}

pub fn cold_defaults() -> LinkageDefaults {
    LinkageDefaults::NOOP
        .with(Symbol::Initialize, cold_initialize)
        .with(Symbol::Autonomous, cold_autonomous)
        .with(Symbol::OpControl, cold_opcontrol)
        .with(Symbol::Disabled, cold_disabled)
        .with(Symbol::CompetitionInitialize, cold_comp_init)
}

fn leaked_region(signature: MagicSignature) -> HotRegion {
    let magic = Box::leak(Box::new(signature));
    let table = Box::leak(Box::new(HotTable::EMPTY));
    unsafe { HotRegion::from_raw(magic, table) }
}

/// Registry for a cold-only image
pub fn cold_users() -> &'static UserFunctions {
    let handshake = leaked_region(MagicSignature::BLANK).handshake();
    Box::leak(Box::new(UserFunctions::new(handshake, cold_defaults())))
}

/// Registry for a hot image exporting `functions`
pub fn hot_users(functions: HotFunctions) -> &'static UserFunctions {
    let magic = Box::leak(Box::new(MagicSignature::BLANK)) as *mut MagicSignature;
    let table = Box::leak(Box::new(HotTable::EMPTY)) as *mut HotTable;
    let exports = HotExports {
        build: BuildInfo {
            timestamp: c"Oct  1 2024 12:00:00",
            directory: c"/work/robot",
        },
        functions,
    };
    install_hot_table(
        unsafe { HotRegion::from_raw(magic, table) },
        &exports,
        HotStartup {
            zeroed: &mut [],
            constructors: &[],
        },
    );
    let handshake = unsafe { HotRegion::from_raw(magic, table) }.handshake();
    assert!(handshake.is_hot());
    Box::leak(Box::new(UserFunctions::new(handshake, cold_defaults())))
}

static USER_SLOT: StaticTask<256> = StaticTask::new();

pub type SimSupervisor = Supervisor<SimRtos, &'static SimDevices, &'static ScriptedStatus>;

pub struct Rig {
    pub rtos: &'static SimRtos,
    pub devices: &'static SimDevices,
    pub status: &'static ScriptedStatus,
    pub supervisor: &'static SimSupervisor,
    pub trace: Trace,
}

impl Rig {
    pub fn new(after_return: AfterReturn, users: &'static UserFunctions) -> Self {
        Self::with_config(after_return, users, DaemonConfig::default())
    }

    pub fn with_config(after_return: AfterReturn, users: &'static UserFunctions, config: DaemonConfig) -> Self {
        let trace = Trace::new();
        let rtos = SimRtos::with_trace(TaskPriority::DAEMON, trace.clone()).leak();
        rtos.set_after_return(after_return);
        let devices: &'static SimDevices = Box::leak(Box::new(SimDevices::new(trace.clone())));
        let status: &'static ScriptedStatus = Box::leak(Box::new(ScriptedStatus::default()));
        let supervisor = Box::leak(Box::new(Supervisor::new(
            rtos,
            devices,
            status,
            users,
            USER_SLOT.memory(),
            config,
        )));
        take_calls();
        Self {
            rtos,
            devices,
            status,
            supervisor,
            trace,
        }
    }

    /// Run one steady-state poll with `status` on the field link
    pub fn poll_with(&self, state: &mut DaemonState, status: CompetitionStatus) {
        self.status.set(status);
        self.supervisor.poll(state);
    }
}
