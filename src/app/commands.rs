//! Inbound commands to the station.
//!
//! These represent operator actions arriving from whatever front end is
//! attached (serial console, web UI, display buttons).  The
//! [`Station`](super::service::Station) turns each one into a lifecycle
//! event.

use crate::motion::AxisId;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Store a program (command dialect or Excellon drill file) and start
    /// the task flow with calibration.
    UploadTask(Vec<u8>),

    /// Enter jog mode.
    SelectManual,

    /// Leave jog mode.
    ExitManual,

    /// Move one axis target by `delta` steps.  Only honoured in jog mode.
    Jog { axis: AxisId, delta: i32 },

    /// Home the axes without a task.
    RequestCalibration,

    /// Confirm the calibrated task and begin heating.
    Approve,

    /// Drop the calibrated task.
    Cancel,

    Pause,

    /// Resume a paused task.
    Continue,

    /// Finish a paused task early (heater off, cool down).
    Finish,

    /// Halt the controller and switch everything off.
    Stop,
}
