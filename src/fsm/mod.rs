//! Event-driven lifecycle state machine engine.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  LifecycleController<M>                                       │
//! │  ┌──────────────┬───────────┬───────────┬──────────────────┐  │
//! │  │ State        │ on_enter  │ on_exit   │ on_execute       │  │
//! │  ├──────────────┼───────────┼───────────┼──────────────────┤  │
//! │  │ Init         │ Hook<M>?  │ Hook<M>?  │ Hook<M>?         │  │
//! │  │ ...          │           │           │                  │  │
//! │  │ Lock         │ Hook<M>?  │ Hook<M>?  │ Hook<M>?         │  │
//! │  └──────────────┴───────────┴───────────┴──────────────────┘  │
//! │  queue: Deque<LifecycleEvent, 10>     rules: table::TRANSITIONS │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each `tick` dequeues at most one event and looks it up in the static
//! [`table`].  A matching rule runs `on_exit` of the old state, updates
//! statistics, resets the [`ExecutionContext`] and runs `on_enter` of the
//! new one.  Then, transition or not, the current state's `on_execute`
//! runs exactly once.
//!
//! The engine knows nothing about motors or temperature.  All side
//! effects live in hooks, which receive the machine `M` by reference and
//! may post follow-up events.  Hook failures are logged and otherwise
//! ignored; the only way into an error state is an explicit event.

pub mod context;
pub mod states;
pub mod table;

use core::fmt;

use heapless::Deque;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::LifecycleConfig;
use crate::error::Error;

/// Capacity of the pending-event FIFO.
pub const EVENT_QUEUE_CAPACITY: usize = 10;

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    Init = 0,
    Idle = 1,
    ManualControl = 2,
    Calibration = 3,
    Ready = 4,
    Heating = 5,
    Executing = 6,
    Paused = 7,
    NormalExit = 8,
    CalibrationError = 9,
    HeatingError = 10,
    DataError = 11,
    Lock = 12,
}

impl LifecycleState {
    pub const COUNT: usize = 13;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Init,
        Self::Idle,
        Self::ManualControl,
        Self::Calibration,
        Self::Ready,
        Self::Heating,
        Self::Executing,
        Self::Paused,
        Self::NormalExit,
        Self::CalibrationError,
        Self::HeatingError,
        Self::DataError,
        Self::Lock,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Idle => "IDLE",
            Self::ManualControl => "MANUAL_CONTROL",
            Self::Calibration => "CALIBRATION",
            Self::Ready => "READY",
            Self::Heating => "HEATING",
            Self::Executing => "EXECUTING",
            Self::Paused => "PAUSED",
            Self::NormalExit => "NORMAL_EXIT",
            Self::CalibrationError => "CALIBRATION_ERROR",
            Self::HeatingError => "HEATING_ERROR",
            Self::DataError => "DATA_ERROR",
            Self::Lock => "LOCK",
        }
    }

    /// Entering this state counts as an error.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::CalibrationError | Self::HeatingError | Self::DataError | Self::Lock
        )
    }

    pub fn color(self) -> StateColor {
        match self {
            Self::Idle | Self::Ready | Self::Paused | Self::Lock => StateColor::Standby,
            Self::Calibration | Self::Heating | Self::Executing | Self::NormalExit => {
                StateColor::Process
            }
            Self::CalibrationError | Self::HeatingError | Self::DataError => StateColor::Error,
            Self::Init => StateColor::Init,
            Self::ManualControl => StateColor::Other,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display-colour class for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateColor {
    Standby,
    Process,
    Error,
    Init,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    InitDone,
    SelectManual,
    ExitManual,
    TaskSent,
    RequestCalibration,
    CalibrationSuccess,
    CalibrationError,
    CancelTask,
    CalibrationDone,
    TaskApproved,
    HeatingSuccess,
    HeatingError,
    PauseRequest,
    TaskDone,
    DataError,
    ExitRequest,
    ContinueTask,
    DeinitSuccess,
    CoolingError,
}

impl LifecycleEvent {
    pub const ALL: [Self; 19] = [
        Self::InitDone,
        Self::SelectManual,
        Self::ExitManual,
        Self::TaskSent,
        Self::RequestCalibration,
        Self::CalibrationSuccess,
        Self::CalibrationError,
        Self::CancelTask,
        Self::CalibrationDone,
        Self::TaskApproved,
        Self::HeatingSuccess,
        Self::HeatingError,
        Self::PauseRequest,
        Self::TaskDone,
        Self::DataError,
        Self::ExitRequest,
        Self::ContinueTask,
        Self::DeinitSuccess,
        Self::CoolingError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InitDone => "INIT_DONE",
            Self::SelectManual => "SELECT_MANUAL",
            Self::ExitManual => "EXIT_MANUAL",
            Self::TaskSent => "TASK_SENT",
            Self::RequestCalibration => "REQUEST_CALIBRATION",
            Self::CalibrationSuccess => "CALIBRATION_SUCCESS",
            Self::CalibrationError => "CALIBRATION_ERROR",
            Self::CancelTask => "CANCEL_TASK",
            Self::CalibrationDone => "CALIBRATION_DONE",
            Self::TaskApproved => "TASK_APPROVED",
            Self::HeatingSuccess => "HEATING_SUCCESS",
            Self::HeatingError => "HEATING_ERROR",
            Self::PauseRequest => "PAUSE_REQUEST",
            Self::TaskDone => "TASK_DONE",
            Self::DataError => "DATA_ERROR",
            Self::ExitRequest => "EXIT_REQUEST",
            Self::ContinueTask => "CONTINUE_TASK",
            Self::DeinitSuccess => "DEINIT_SUCCESS",
            Self::CoolingError => "COOLING_ERROR",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The event FIFO was full; the event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull(pub LifecycleEvent);

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event queue full, {} dropped", self.0)
    }
}

type EventQueue = Deque<LifecycleEvent, EVENT_QUEUE_CAPACITY>;

fn enqueue(queue: &mut EventQueue, event: LifecycleEvent) -> Result<(), QueueFull> {
    queue.push_back(event).map_err(|e| {
        warn!("FSM: event queue full, {} dropped", e);
        QueueFull(e)
    })
}

// ---------------------------------------------------------------------------
// Execution context and hooks
// ---------------------------------------------------------------------------

/// Per-state scratch, reset on every state entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Time the current state was entered.
    pub entered_at_ms: u64,
    /// Execute-hook invocations so far in this state.
    pub iterations: u32,
    /// Set by hooks once their one-shot work is done.
    pub completed: bool,
    /// Free for hook use.
    pub scratch: u64,
}

impl ExecutionContext {
    fn reset(&mut self, now_ms: u64) {
        *self = Self {
            entered_at_ms: now_ms,
            ..Self::default()
        };
    }

    pub fn is_first_iteration(&self) -> bool {
        self.iterations == 0
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entered_at_ms)
    }
}

/// Everything a hook can touch.
pub struct HookCtx<'a, M> {
    pub machine: &'a mut M,
    pub exec: &'a mut ExecutionContext,
    pub state: LifecycleState,
    pub now_ms: u64,
    queue: &'a mut EventQueue,
}

impl<M> HookCtx<'_, M> {
    /// Queue a follow-up event for a later tick.
    pub fn post(&mut self, event: LifecycleEvent) -> Result<(), QueueFull> {
        debug!("FSM: {} posted from {}", event, self.state);
        enqueue(self.queue, event)
    }

    /// Post once per state visit; later calls are no-ops.
    pub fn post_once(&mut self, event: LifecycleEvent) {
        if !self.exec.completed {
            self.exec.completed = true;
            // Already logged on overflow.
            let _ = self.post(event);
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.exec.elapsed_ms(self.now_ms)
    }
}

pub type Hook<M> = Box<dyn FnMut(&mut HookCtx<'_, M>) -> Result<(), Error>>;

struct StateHooks<M> {
    enter: Option<Hook<M>>,
    exit: Option<Hook<M>>,
    execute: Option<Hook<M>>,
}

impl<M> Default for StateHooks<M> {
    fn default() -> Self {
        Self {
            enter: None,
            exit: None,
            execute: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Enter,
    Exit,
    Execute,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStatistics {
    pub time_in_state_ms: [u64; LifecycleState::COUNT],
    pub enter_count: [u32; LifecycleState::COUNT],
    pub error_count: u32,
    pub task_completed_count: u32,
}

impl LifecycleStatistics {
    pub fn time_in(&self, state: LifecycleState) -> u64 {
        self.time_in_state_ms[state.index()]
    }

    pub fn entries(&self, state: LifecycleState) -> u32 {
        self.enter_count[state.index()]
    }

    fn record(&mut self, from: LifecycleState, to: LifecycleState, spent_ms: u64) {
        self.time_in_state_ms[from.index()] += spent_ms;
        self.enter_count[to.index()] += 1;
        if to.is_error() {
            self.error_count += 1;
        }
        if from == LifecycleState::NormalExit && to == LifecycleState::Idle {
            self.task_completed_count += 1;
        }
    }
}

/// What one `tick` did with the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The controller is stopped; nothing ran.
    Stopped,
    NoEvent,
    Transitioned {
        from: LifecycleState,
        to: LifecycleState,
        event: LifecycleEvent,
    },
    /// No rule for `event` in `state`; the event was discarded.
    Rejected {
        state: LifecycleState,
        event: LifecycleEvent,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct LifecycleController<M> {
    hooks: [StateHooks<M>; LifecycleState::COUNT],
    state: LifecycleState,
    queue: EventQueue,
    exec: ExecutionContext,
    stats: LifecycleStatistics,
    config: LifecycleConfig,
    running: bool,
    /// `start` has entered the initial state once.
    started: bool,
}

impl<M> LifecycleController<M> {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            hooks: core::array::from_fn(|_| StateHooks::default()),
            state: LifecycleState::Init,
            queue: Deque::new(),
            exec: ExecutionContext::default(),
            stats: LifecycleStatistics::default(),
            config,
            running: false,
            started: false,
        }
    }

    // ── Hook registration ─────────────────────────────────────

    pub fn on_enter(
        &mut self,
        state: LifecycleState,
        hook: impl FnMut(&mut HookCtx<'_, M>) -> Result<(), Error> + 'static,
    ) {
        self.hooks[state.index()].enter = Some(Box::new(hook));
    }

    pub fn on_exit(
        &mut self,
        state: LifecycleState,
        hook: impl FnMut(&mut HookCtx<'_, M>) -> Result<(), Error> + 'static,
    ) {
        self.hooks[state.index()].exit = Some(Box::new(hook));
    }

    pub fn on_execute(
        &mut self,
        state: LifecycleState,
        hook: impl FnMut(&mut HookCtx<'_, M>) -> Result<(), Error> + 'static,
    ) {
        self.hooks[state.index()].execute = Some(Box::new(hook));
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Begin processing ticks and run the initial state's enter hook.
    ///
    /// After a [`stop`](Self::stop) this only resumes ticking: the current
    /// state is not re-entered and its context is kept.
    pub fn start(&mut self, machine: &mut M, now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        if self.started {
            info!("FSM resumed in state: {}", self.state);
            return;
        }
        self.started = true;
        self.exec.reset(now_ms);
        if self.config.enable_statistics {
            self.stats.enter_count[self.state.index()] += 1;
        }
        info!("FSM starting in state: {}", self.state);
        self.run_hook(Slot::Enter, machine, now_ms);
    }

    /// Stop processing ticks.  State and queue are kept.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("FSM stopped in state: {}", self.state);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── Events ────────────────────────────────────────────────

    /// Append to the FIFO.  Never blocks; a full queue drops the event.
    pub fn post_event(&mut self, event: LifecycleEvent) -> Result<(), QueueFull> {
        enqueue(&mut self.queue, event)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Process at most one event, then run the current execute hook.
    pub fn tick(&mut self, machine: &mut M, now_ms: u64) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }

        let outcome = match self.queue.pop_front() {
            None => TickOutcome::NoEvent,
            Some(event) => match table::lookup(self.state, event) {
                Some(to) => {
                    let from = self.state;
                    self.transition(machine, to, now_ms);
                    TickOutcome::Transitioned { from, to, event }
                }
                None => {
                    warn!("FSM: event {} invalid in state {}", event, self.state);
                    TickOutcome::Rejected {
                        state: self.state,
                        event,
                    }
                }
            },
        };

        self.run_hook(Slot::Execute, machine, now_ms);
        self.exec.iterations = self.exec.iterations.saturating_add(1);
        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_in_error(&self) -> bool {
        self.state.is_error()
    }

    pub fn time_in_state(&self, now_ms: u64) -> u64 {
        self.exec.elapsed_ms(now_ms)
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        &self.exec
    }

    pub fn statistics(&self) -> &LifecycleStatistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats = LifecycleStatistics::default();
        info!("FSM: statistics reset");
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, machine: &mut M, to: LifecycleState, now_ms: u64) {
        let from = self.state;
        if self.config.enable_logging {
            info!("FSM transition: {} -> {}", from, to);
        }

        self.run_hook(Slot::Exit, machine, now_ms);

        if self.config.enable_statistics {
            self.stats.record(from, to, self.exec.elapsed_ms(now_ms));
        }

        self.exec.reset(now_ms);
        self.state = to;

        self.run_hook(Slot::Enter, machine, now_ms);
    }

    fn run_hook(&mut self, slot: Slot, machine: &mut M, now_ms: u64) {
        let state = self.state;
        let hooks = &mut self.hooks[state.index()];
        let hook = match slot {
            Slot::Enter => hooks.enter.as_mut(),
            Slot::Exit => hooks.exit.as_mut(),
            Slot::Execute => hooks.execute.as_mut(),
        };
        let Some(hook) = hook else {
            return;
        };
        let mut ctx = HookCtx {
            machine,
            exec: &mut self.exec,
            state,
            now_ms,
            queue: &mut self.queue,
        };
        if let Err(e) = hook(&mut ctx) {
            warn!("FSM: {:?} hook of {} failed: {}", slot, state, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use LifecycleEvent as E;
    use LifecycleState as S;

    /// Records hook calls in order.
    #[derive(Default)]
    struct Trace(Vec<String>);

    fn controller() -> LifecycleController<Trace> {
        LifecycleController::new(SystemConfig::default().lifecycle)
    }

    /// Drive the controller into `target` along the rule table.
    fn walk(fsm: &mut LifecycleController<Trace>, m: &mut Trace, events: &[E]) {
        for &e in events {
            fsm.post_event(e).unwrap();
            fsm.tick(m, 0);
        }
    }

    #[test]
    fn starts_in_init() {
        let fsm = controller();
        assert_eq!(fsm.state(), S::Init);
        assert!(!fsm.is_running());
    }

    #[test]
    fn ticks_ignored_until_started() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.post_event(E::InitDone).unwrap();
        assert_eq!(fsm.tick(&mut m, 0), TickOutcome::Stopped);
        assert_eq!(fsm.state(), S::Init);
        assert_eq!(fsm.pending_events(), 1);
    }

    #[test]
    fn start_runs_enter_hook() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_enter(S::Init, |ctx| {
            ctx.machine.0.push("enter init".into());
            Ok(())
        });
        fsm.start(&mut m, 0);
        assert_eq!(m.0, vec!["enter init"]);
    }

    #[test]
    fn valid_event_transitions() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        fsm.post_event(E::InitDone).unwrap();
        assert_eq!(
            fsm.tick(&mut m, 100),
            TickOutcome::Transitioned {
                from: S::Init,
                to: S::Idle,
                event: E::InitDone
            }
        );
        assert_eq!(fsm.state(), S::Idle);
    }

    #[test]
    fn invalid_event_is_rejected() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        fsm.post_event(E::TaskDone).unwrap();
        assert_eq!(
            fsm.tick(&mut m, 0),
            TickOutcome::Rejected {
                state: S::Init,
                event: E::TaskDone
            }
        );
        assert_eq!(fsm.state(), S::Init);
        assert_eq!(fsm.pending_events(), 0);
    }

    #[test]
    fn hooks_run_in_order() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_exit(S::Init, |ctx| {
            ctx.machine.0.push("exit init".into());
            Ok(())
        });
        fsm.on_enter(S::Idle, |ctx| {
            ctx.machine.0.push("enter idle".into());
            Ok(())
        });
        fsm.on_execute(S::Idle, |ctx| {
            ctx.machine.0.push("exec idle".into());
            Ok(())
        });
        fsm.start(&mut m, 0);
        fsm.post_event(E::InitDone).unwrap();
        fsm.tick(&mut m, 0);
        assert_eq!(m.0, vec!["exit init", "enter idle", "exec idle"]);
    }

    #[test]
    fn execute_runs_every_tick_without_events() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_execute(S::Init, |ctx| {
            ctx.machine.0.push(format!("iter {}", ctx.exec.iterations));
            Ok(())
        });
        fsm.start(&mut m, 0);
        for t in 0..3 {
            assert_eq!(fsm.tick(&mut m, t), TickOutcome::NoEvent);
        }
        assert_eq!(m.0, vec!["iter 0", "iter 1", "iter 2"]);
    }

    #[test]
    fn hook_failure_is_not_fatal() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_exit(S::Init, |_| Err(Error::Init("boom")));
        fsm.on_enter(S::Idle, |_| Err(Error::Init("boom")));
        fsm.start(&mut m, 0);
        fsm.post_event(E::InitDone).unwrap();
        fsm.tick(&mut m, 0);
        assert_eq!(fsm.state(), S::Idle);
    }

    #[test]
    fn hooks_can_post_events() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_execute(S::Init, |ctx| {
            ctx.post_once(E::InitDone);
            Ok(())
        });
        fsm.start(&mut m, 0);
        fsm.tick(&mut m, 0);
        fsm.tick(&mut m, 0);
        assert_eq!(fsm.state(), S::Idle);
        assert_eq!(fsm.pending_events(), 0);
    }

    #[test]
    fn eleventh_event_is_dropped() {
        let mut fsm = controller();
        for _ in 0..EVENT_QUEUE_CAPACITY {
            fsm.post_event(E::InitDone).unwrap();
        }
        assert_eq!(
            fsm.post_event(E::TaskSent),
            Err(QueueFull(E::TaskSent))
        );
        assert_eq!(fsm.pending_events(), EVENT_QUEUE_CAPACITY);
    }

    #[test]
    fn one_event_per_tick() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        fsm.post_event(E::InitDone).unwrap();
        fsm.post_event(E::SelectManual).unwrap();
        fsm.tick(&mut m, 0);
        assert_eq!(fsm.state(), S::Idle);
        fsm.tick(&mut m, 0);
        assert_eq!(fsm.state(), S::ManualControl);
    }

    #[test]
    fn statistics_track_time_and_entries() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 1_000);
        fsm.post_event(E::InitDone).unwrap();
        fsm.tick(&mut m, 1_500);
        fsm.post_event(E::SelectManual).unwrap();
        fsm.tick(&mut m, 4_000);

        let s = fsm.statistics();
        assert_eq!(s.time_in(S::Init), 500);
        assert_eq!(s.time_in(S::Idle), 2_500);
        assert_eq!(s.entries(S::Idle), 1);
        assert_eq!(s.entries(S::ManualControl), 1);
        assert_eq!(fsm.time_in_state(4_250), 250);
    }

    #[test]
    fn task_completion_counted_only_on_normal_exit_to_idle() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        walk(
            &mut fsm,
            &mut m,
            &[
                E::InitDone,
                E::TaskSent,
                E::CalibrationSuccess,
                E::TaskApproved,
                E::HeatingSuccess,
            ],
        );
        assert_eq!(fsm.statistics().task_completed_count, 0);
        walk(&mut fsm, &mut m, &[E::TaskDone]);
        assert_eq!(fsm.state(), S::NormalExit);
        assert_eq!(fsm.statistics().task_completed_count, 0);
        walk(&mut fsm, &mut m, &[E::DeinitSuccess]);
        assert_eq!(fsm.state(), S::Idle);
        assert_eq!(fsm.statistics().task_completed_count, 1);
    }

    #[test]
    fn error_states_count_and_escalate() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        walk(
            &mut fsm,
            &mut m,
            &[E::InitDone, E::RequestCalibration, E::CalibrationError],
        );
        assert_eq!(fsm.state(), S::CalibrationError);
        assert!(fsm.is_in_error());
        assert_eq!(fsm.statistics().error_count, 1);

        walk(&mut fsm, &mut m, &[E::CalibrationError]);
        assert_eq!(fsm.state(), S::Lock);
        assert_eq!(fsm.statistics().error_count, 2);

        walk(&mut fsm, &mut m, &[E::InitDone, E::ContinueTask]);
        assert_eq!(fsm.state(), S::Lock);
    }

    #[test]
    fn statistics_can_be_disabled_and_reset() {
        let mut cfg = SystemConfig::default().lifecycle;
        cfg.enable_statistics = false;
        let mut fsm: LifecycleController<Trace> = LifecycleController::new(cfg);
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        walk(&mut fsm, &mut m, &[E::InitDone]);
        assert_eq!(fsm.statistics(), &LifecycleStatistics::default());

        let mut fsm = controller();
        fsm.start(&mut m, 0);
        walk(&mut fsm, &mut m, &[E::InitDone]);
        fsm.reset_statistics();
        assert_eq!(fsm.statistics().entries(S::Idle), 0);
    }

    #[test]
    fn context_resets_on_entry() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_execute(S::Init, |ctx| {
            ctx.exec.scratch = 42;
            Ok(())
        });
        fsm.start(&mut m, 0);
        fsm.tick(&mut m, 10);
        assert_eq!(fsm.execution_context().scratch, 42);
        fsm.post_event(E::InitDone).unwrap();
        fsm.tick(&mut m, 20);
        let ctx = fsm.execution_context();
        assert_eq!(ctx.scratch, 0);
        assert_eq!(ctx.entered_at_ms, 20);
        assert_eq!(ctx.iterations, 1);
    }

    #[test]
    fn stop_halts_processing() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.start(&mut m, 0);
        fsm.stop();
        fsm.post_event(E::InitDone).unwrap();
        assert_eq!(fsm.tick(&mut m, 0), TickOutcome::Stopped);
        fsm.start(&mut m, 0);
        fsm.tick(&mut m, 0);
        assert_eq!(fsm.state(), S::Idle);
    }

    #[test]
    fn restart_does_not_reenter_state() {
        let mut fsm = controller();
        let mut m = Trace::default();
        fsm.on_enter(S::Idle, |ctx| {
            ctx.machine.0.push("enter idle".into());
            Ok(())
        });
        fsm.start(&mut m, 0);
        walk(&mut fsm, &mut m, &[E::InitDone]);
        fsm.tick(&mut m, 100);
        let iterations = fsm.execution_context().iterations;

        fsm.stop();
        fsm.start(&mut m, 500);

        assert_eq!(m.0, vec!["enter idle"]);
        assert_eq!(fsm.statistics().entries(S::Idle), 1);
        assert_eq!(fsm.statistics().entries(S::Init), 1);
        assert_eq!(fsm.execution_context().iterations, iterations);
        assert_eq!(fsm.time_in_state(500), 500);
    }

    #[test]
    fn colour_classes() {
        assert_eq!(S::Idle.color(), StateColor::Standby);
        assert_eq!(S::Lock.color(), StateColor::Standby);
        assert_eq!(S::Executing.color(), StateColor::Process);
        assert_eq!(S::DataError.color(), StateColor::Error);
        assert_eq!(S::Init.color(), StateColor::Init);
        assert_eq!(S::ManualControl.color(), StateColor::Other);
        assert_eq!(S::HeatingError.to_string(), "HEATING_ERROR");
        assert_eq!(E::TaskSent.to_string(), "TASK_SENT");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::config::SystemConfig;
    use proptest::prelude::*;

    fn arb_event() -> impl Strategy<Value = LifecycleEvent> {
        proptest::sample::select(LifecycleEvent::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn only_table_rules_change_state(events in proptest::collection::vec(arb_event(), 1..200)) {
            let mut fsm: LifecycleController<()> =
                LifecycleController::new(SystemConfig::default().lifecycle);
            fsm.start(&mut (), 0);
            for (t, event) in events.into_iter().enumerate() {
                let before = fsm.state();
                let stats_before = fsm.statistics().clone();
                fsm.post_event(event).unwrap();
                let outcome = fsm.tick(&mut (), t as u64);
                match table::lookup(before, event) {
                    Some(to) => {
                        prop_assert_eq!(fsm.state(), to);
                        prop_assert_eq!(outcome, TickOutcome::Transitioned { from: before, to, event });
                        for s in LifecycleState::ALL {
                            let expect = stats_before.entries(s) + u32::from(s == to);
                            prop_assert_eq!(fsm.statistics().entries(s), expect);
                        }
                        let err = stats_before.error_count + u32::from(to.is_error());
                        prop_assert_eq!(fsm.statistics().error_count, err);
                        let done = stats_before.task_completed_count
                            + u32::from(before == LifecycleState::NormalExit && to == LifecycleState::Idle);
                        prop_assert_eq!(fsm.statistics().task_completed_count, done);
                    }
                    None => {
                        prop_assert_eq!(fsm.state(), before);
                        prop_assert_eq!(outcome, TickOutcome::Rejected { state: before, event });
                        prop_assert_eq!(fsm.statistics(), &stats_before);
                    }
                }
            }
        }
    }
}
