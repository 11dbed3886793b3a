//! Static transition table.
//!
//! ```text
//!  Init ──▶ Idle ──▶ Calibration ──▶ Ready ──▶ Heating ──▶ Executing ──▶ NormalExit ──▶ Idle
//!            ▲ │                        │          ▲            │
//!            │ ▼                        ▼          └── Paused ◀─┘
//!      ManualControl                  Idle
//!
//!  CalibrationError / HeatingError / DataError ──▶ Lock
//! ```
//!
//! Lookup takes the first matching rule.  No rule leaves `Lock`.

use super::{LifecycleEvent as E, LifecycleState as S};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: S,
    pub event: E,
    pub to: S,
}

const fn rule(from: S, event: E, to: S) -> TransitionRule {
    TransitionRule { from, event, to }
}

pub const TRANSITIONS: &[TransitionRule] = &[
    rule(S::Init, E::InitDone, S::Idle),
    rule(S::Idle, E::SelectManual, S::ManualControl),
    rule(S::Idle, E::TaskSent, S::Calibration),
    rule(S::Idle, E::RequestCalibration, S::Calibration),
    rule(S::ManualControl, E::ExitManual, S::Idle),
    rule(S::Calibration, E::CalibrationSuccess, S::Ready),
    rule(S::Calibration, E::CalibrationError, S::CalibrationError),
    rule(S::Ready, E::CancelTask, S::Idle),
    rule(S::Ready, E::CalibrationDone, S::Idle),
    rule(S::Ready, E::TaskApproved, S::Heating),
    rule(S::Heating, E::HeatingSuccess, S::Executing),
    rule(S::Heating, E::HeatingError, S::HeatingError),
    rule(S::Executing, E::PauseRequest, S::Paused),
    rule(S::Executing, E::TaskDone, S::NormalExit),
    rule(S::Executing, E::HeatingError, S::HeatingError),
    rule(S::Executing, E::DataError, S::DataError),
    rule(S::Paused, E::ExitRequest, S::NormalExit),
    rule(S::Paused, E::ContinueTask, S::Heating),
    rule(S::NormalExit, E::DeinitSuccess, S::Idle),
    rule(S::NormalExit, E::CoolingError, S::HeatingError),
    rule(S::CalibrationError, E::CalibrationError, S::Lock),
    rule(S::HeatingError, E::HeatingError, S::Lock),
    rule(S::DataError, E::DataError, S::Lock),
];

/// Destination for `event` in `from`, if any rule matches.
pub fn lookup(from: S, event: E) -> Option<S> {
    TRANSITIONS
        .iter()
        .find(|r| r.from == from && r.event == event)
        .map(|r| r.to)
}
