//! Outbound station events.
//!
//! The [`Station`](super::service::Station) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, push to a web UI,
//! drive a status display.

use serde::Serialize;

use crate::fsm::{LifecycleEvent, LifecycleState, LifecycleStatistics, StateColor};
use crate::motion::sequencer::SequencerState;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has started (carries the initial state).
    Started(LifecycleState),

    /// The lifecycle moved between states.
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
        event: LifecycleEvent,
    },

    /// An event arrived that the current state has no rule for.
    TransitionRejected {
        state: LifecycleState,
        event: LifecycleEvent,
    },

    /// The event queue was full.
    EventDropped(LifecycleEvent),

    /// Periodic status snapshot.
    Status(StatusReport),

    /// The controller was halted by command.
    Stopped(LifecycleState),
}

/// A point-in-time view of the station, suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub state: LifecycleState,
    pub color: StateColor,
    pub time_in_state_ms: u64,
    /// Sub-state of the running job, if one is loaded.
    pub sequencer: Option<SequencerState>,
    /// Points or commands finished in the current (or last) job.
    pub completed: u32,
    pub progress_percent: u8,
    /// Last tip reading; `None` before the first read or after a fault.
    pub temperature_c: Option<f32>,
    pub target_c: f32,
    pub heater_duty: f32,
    pub pending_events: usize,
    pub statistics: LifecycleStatistics,
}
