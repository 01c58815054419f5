//! Supervisor tests on the simulated RTOS

mod common;

use common::{cold_users, hot_users, take_calls, Rig};
use sysd_core::{CompetitionStatus, Millis, Phase, StaticTask, TaskHandle, TaskPriority, TaskState};
use sysd_daemon::{DaemonConfig, DAEMON_TASK_NAME, HISTORY_DEPTH};
use sysd_hot::{HotFunctions, Symbol};
use sysd_posix::{AfterReturn, SimEvent, MAIN_TASK};

const D: CompetitionStatus = CompetitionStatus::DISABLED;
const A: CompetitionStatus = CompetitionStatus::AUTONOMOUS;
const C: CompetitionStatus = CompetitionStatus::CONNECTED;
const NONE: CompetitionStatus = CompetitionStatus::empty();

fn deletes(rig: &Rig) -> usize {
    rig.trace.count(|e| matches!(e, SimEvent::Deleted(_)))
}

#[test]
fn test_startup_holds_locks_then_runs_initialize() {
    let rig = Rig::new(AfterReturn::Exit, cold_users());
    let state = rig.supervisor.start();

    let init = TaskHandle::from_raw(2);
    assert_eq!(
        rig.trace.events(),
        vec![
            SimEvent::TakeAll,
            SimEvent::Delay(2),
            SimEvent::GiveAll,
            SimEvent::Spawned {
                task: init,
                name: "User Initialization",
                priority: TaskPriority::DEFAULT,
            },
            SimEvent::Ran(init),
            SimEvent::Notified(MAIN_TASK),
            SimEvent::Returned(init),
            SimEvent::NotifyTaken(true),
        ]
    );
    assert_eq!(take_calls(), ["initialize"]);
    assert_eq!(state.current_task(), Some(init));
    assert_eq!(state.last_status(), CompetitionStatus::UNOBSERVED);
    assert!(state.history().next().is_none());
}

#[test]
fn test_startup_pumps_while_initialize_is_pending() {
    let rig = Rig::new(AfterReturn::Exit, cold_users());
    // The startup hold is the first blocking call, then three waits time out.
    rig.rtos.defer(4);
    let state = rig.supervisor.start();

    assert_eq!(rig.devices.service_count(), 3);
    assert_eq!(rig.trace.count(|e| *e == SimEvent::NotifyTaken(false)), 3);
    assert_eq!(take_calls(), ["initialize"]);
    // 2 ms hold plus three timed-out 2 ms waits
    assert_eq!(state.wake(), Millis::new(8));
}

#[test]
fn test_scenario_sequence() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    assert_eq!(take_calls(), ["initialize"]);

    rig.poll_with(&mut state, C);
    assert_eq!(state.last_transition().map(|t| t.phase), Some(Phase::OpControl));

    rig.poll_with(&mut state, C | D);
    assert_eq!(state.last_transition().map(|t| t.phase), Some(Phase::Disabled));

    // Both disabled: no restart, but the new status is remembered.
    let disabled_task = state.current_task();
    rig.poll_with(&mut state, D);
    assert_eq!(state.current_task(), disabled_task);
    assert_eq!(state.last_status(), D);

    rig.poll_with(&mut state, A);
    assert_eq!(state.last_transition().map(|t| t.phase), Some(Phase::Autonomous));

    rig.poll_with(&mut state, NONE);
    assert_eq!(state.last_transition().map(|t| t.phase), Some(Phase::OpControl));

    assert_eq!(take_calls(), ["opcontrol", "disabled", "autonomous", "opcontrol"]);
    let phases: Vec<Phase> = state.history().map(|t| t.phase).collect();
    assert_eq!(phases, [Phase::OpControl, Phase::Disabled, Phase::Autonomous, Phase::OpControl]);
    assert!(state.history().all(|t| t.replaced));
    assert_eq!(deletes(&rig), 4);
    assert_eq!(rig.rtos.live_tasks(), vec![state.current_task().unwrap()]);
}

#[test]
fn test_first_observation_connected_and_disabled_runs_competition_initialize() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    take_calls();

    rig.poll_with(&mut state, C | D);
    assert_eq!(state.last_transition().map(|t| t.phase), Some(Phase::Init));
    let task = state.current_task().unwrap();
    assert_eq!(rig.rtos.task(task).unwrap().name, "User Comp. Init.");
    assert_eq!(take_calls(), ["competition_initialize"]);
}

#[test]
fn test_unchanged_status_does_nothing() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    rig.poll_with(&mut state, D);
    take_calls();
    let spawned = rig.trace.count(|e| matches!(e, SimEvent::Spawned { .. }));

    for _ in 0..5 {
        rig.poll_with(&mut state, D);
    }
    assert!(take_calls().is_empty());
    assert_eq!(rig.trace.count(|e| matches!(e, SimEvent::Spawned { .. })), spawned);
    assert_eq!(state.history().count(), 1);
}

#[test]
fn test_ended_tasks_are_never_deleted() {
    // Every body returns and its task reports `Deleted`.
    let rig = Rig::new(AfterReturn::Exit, cold_users());
    let mut state = rig.supervisor.start();

    for status in [C, C | D, D, A, NONE, D | C, A | C] {
        rig.poll_with(&mut state, status);
    }
    assert_eq!(deletes(&rig), 0);
    assert!(state.history().all(|t| !t.replaced));
    assert_eq!(
        take_calls(),
        ["initialize", "opcontrol", "disabled", "autonomous", "opcontrol", "competition_initialize", "autonomous"]
    );
}

#[test]
fn test_invalid_task_is_not_deleted() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    rig.poll_with(&mut state, C);

    let stale = state.current_task().unwrap();
    rig.rtos.set_state(stale, TaskState::Invalid).unwrap();
    rig.poll_with(&mut state, A);

    assert!(!rig.trace.contains(SimEvent::Deleted(stale)));
    assert!(!state.last_transition().unwrap().replaced);
    assert_ne!(state.current_task(), Some(stale));
}

#[test]
fn test_suspended_task_is_deleted() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    rig.poll_with(&mut state, C);

    let suspended = state.current_task().unwrap();
    rig.rtos.set_state(suspended, TaskState::Suspended).unwrap();
    rig.poll_with(&mut state, D);

    assert!(rig.trace.contains(SimEvent::Deleted(suspended)));
    assert!(state.last_transition().unwrap().replaced);
}

#[test]
fn test_running_task_is_left_alone_and_slot_stays_busy() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    rig.poll_with(&mut state, C);
    take_calls();

    let running = state.current_task().unwrap();
    rig.rtos.set_state(running, TaskState::Running).unwrap();
    rig.poll_with(&mut state, D);

    assert!(!rig.trace.contains(SimEvent::Deleted(running)));
    assert_eq!(state.current_task(), None);
    assert!(take_calls().is_empty());

    // Once the old task has ended, the next change fills the slot again.
    rig.rtos.set_state(running, TaskState::Deleted).unwrap();
    rig.poll_with(&mut state, A);
    assert!(state.current_task().is_some());
    assert_eq!(take_calls(), ["autonomous"]);
}

#[test]
fn test_spawn_failure_is_retried_on_next_change() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();
    take_calls();

    rig.rtos.refuse_spawns(true);
    rig.poll_with(&mut state, C);
    assert_eq!(state.current_task(), None);
    assert_eq!(state.last_status(), C);

    rig.rtos.refuse_spawns(false);
    rig.poll_with(&mut state, C);
    assert_eq!(state.current_task(), None);

    rig.poll_with(&mut state, C | D);
    assert!(state.current_task().is_some());
    assert_eq!(take_calls(), ["disabled"]);
}

#[test]
fn test_history_keeps_latest_transitions() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let mut state = rig.supervisor.start();

    for i in 0..12 {
        rig.poll_with(&mut state, if i % 2 == 0 { D } else { NONE });
    }
    assert_eq!(state.history().count(), HISTORY_DEPTH);
    let first = state.history().next().unwrap();
    assert_eq!((first.from, first.to), (NONE, D));
    let last = state.last_transition().unwrap();
    assert_eq!((last.from, last.to, last.phase), (D, NONE, Phase::OpControl));
}

#[test]
fn test_polls_are_spaced_by_the_period() {
    let config = DaemonConfig::builder().period_ms(5).build().unwrap();
    let rig = Rig::with_config(AfterReturn::Park, cold_users(), config);
    let mut state = rig.supervisor.start();
    let start = state.wake();

    for _ in 0..3 {
        rig.poll_with(&mut state, NONE);
    }
    assert_eq!(state.wake(), start.add(15));
    assert_eq!(rig.rtos.now(), start.add(15));
    assert!(rig.trace.contains(SimEvent::DelayUntil(start.add(5))));
    assert!(rig.trace.contains(SimEvent::DelayUntil(start.add(10))));
}

#[test]
fn test_partial_hot_image_runs_stub_for_missing_opcontrol() {
    let users = hot_users(HotFunctions::EMPTY.with(Symbol::Autonomous, common::hot_autonomous));
    let rig = Rig::new(AfterReturn::Park, users);
    let mut state = rig.supervisor.start();

    rig.poll_with(&mut state, A);
    rig.poll_with(&mut state, NONE);
    assert_eq!(take_calls(), ["initialize", "hot autonomous", "opcontrol"]);
    assert!(!users.entry(Symbol::OpControl).is_hot());
}

#[test]
fn test_hot_opcontrol_replaces_builtin() {
    let users = hot_users(HotFunctions::EMPTY.with(Symbol::OpControl, common::hot_opcontrol));
    let rig = Rig::new(AfterReturn::Park, users);
    let mut state = rig.supervisor.start();

    rig.poll_with(&mut state, C);
    assert_eq!(take_calls(), ["initialize", "hot opcontrol"]);
}

static DAEMON_SLOT: StaticTask<256> = StaticTask::new();

#[test]
fn test_spawn_creates_daemon_task() {
    let rig = Rig::new(AfterReturn::Park, cold_users());
    let task = rig.supervisor.spawn(DAEMON_SLOT.memory()).unwrap();

    let info = rig.rtos.task(task).unwrap();
    assert_eq!(info.name, DAEMON_TASK_NAME);
    assert_eq!(info.priority, TaskPriority::DAEMON);
    assert_eq!(info.state, TaskState::Ready);
    assert!(take_calls().is_empty());
}
