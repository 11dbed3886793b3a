//! End-to-end lifecycle runs: Station → hooks → axes / heater / sensor.
//!
//! Every test drives the station with operator commands and simulated
//! time, adjusting the mock sensor where a real tip would heat or cool.

use solderbot::app::commands::AppCommand;
use solderbot::error::SensorError;
use solderbot::fsm::LifecycleState as S;

use super::mock_hw::{MockAxis, Rig, test_config};

const DRILL: &str = "M48\nMETRIC,TZ\nT1C0.800\n%\nT1\nX1.0Y1.0\nX2.0Y1.5\nM30\n";

/// Upload `program`, calibrate, approve and bring the tip to temperature.
fn start_job(rig: &mut Rig, program: &str) {
    rig.send(AppCommand::UploadTask(program.as_bytes().to_vec()));
    rig.run_to(S::Ready, 10);
    rig.send(AppCommand::Approve);
    rig.run_to(S::Heating, 5);
    rig.set_temperature(330.0);
}

#[test]
fn drill_job_runs_to_completion() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, DRILL);
    rig.run_to(S::Executing, 5);

    let report = rig.station.status(rig.now);
    assert_eq!(report.state, S::Executing);
    assert!(report.sequencer.is_some());

    rig.run_to(S::NormalExit, 2_000);
    assert!(!rig.station.machine().regulator.heater().enabled);

    rig.set_temperature(40.0);
    rig.run_to(S::Idle, 5);

    assert_eq!(
        rig.visited(),
        vec![
            S::Idle,
            S::Calibration,
            S::Ready,
            S::Heating,
            S::Executing,
            S::NormalExit,
            S::Idle
        ]
    );
    let report = rig.station.status(rig.now);
    assert_eq!(report.completed, 2);
    assert_eq!(report.statistics.task_completed_count, 1);
    assert_eq!(report.statistics.error_count, 0);

    let axes = &rig.station.machine().axes;
    assert_eq!(axes.x.position(), 0, "returned home");
    assert!(axes.s.position() > 0, "solder was fed");
    assert!(!axes.x.is_enabled());
}

#[test]
fn calibration_only_returns_to_idle() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::RequestCalibration);
    rig.run_to(S::Ready, 10);
    rig.run_to(S::Idle, 5);

    let stats = rig.station.controller().statistics();
    assert_eq!(stats.entries(S::Calibration), 1);
    assert_eq!(stats.entries(S::Idle), 2);
    assert_eq!(stats.task_completed_count, 0);
    assert!(rig.station.machine().axes.z.driver().was_enabled());
}

#[test]
fn stuck_endstop_locks_the_station() {
    let mut rig = Rig::with_axes(
        test_config(),
        [
            MockAxis::with_switch_after(200),
            MockAxis::with_switch_after(200),
            MockAxis::with_stuck_switch(),
            MockAxis::new(),
        ],
    );
    rig.run_to(S::Idle, 10);
    rig.send(AppCommand::RequestCalibration);
    rig.run_to(S::Lock, 10);

    assert!(rig.visited().contains(&S::CalibrationError));
    assert_eq!(rig.station.controller().statistics().error_count, 2);

    let m = rig.station.machine();
    assert!(!m.regulator.is_enabled());
    assert!(!m.axes.z.is_enabled());
    // Z gave up before X and Y were tried.
    assert_eq!(m.axes.x.driver().pulses, 0);

    rig.send(AppCommand::Approve);
    rig.tick();
    rig.send(AppCommand::UploadTask(b"S10\n".to_vec()));
    rig.tick();
    assert_eq!(rig.state(), S::Lock);
}

#[test]
fn heating_timeout_is_an_error() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::UploadTask(b"G0 X1 Y1 Z\n".to_vec()));
    rig.run_to(S::Ready, 10);
    rig.send(AppCommand::Approve);
    rig.run_to(S::Heating, 5);

    // Tip never warms up.
    rig.run_to(S::HeatingError, 60);
    rig.run_to(S::Lock, 5);
    assert!(!rig.station.machine().regulator.heater().enabled);
}

#[test]
fn sensor_fault_while_heating() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::UploadTask(b"G0 X1 Y1 Z\n".to_vec()));
    rig.run_to(S::Ready, 10);
    rig.send(AppCommand::Approve);
    rig.run_to(S::Heating, 5);

    rig.station.machine_mut().sensor.fault = Some(SensorError::NotConnected);
    rig.run_to(S::HeatingError, 3);
    assert_eq!(rig.station.status(rig.now).temperature_c, None);
}

#[test]
fn sensor_fault_while_executing() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, "G0 X5 Y5 Z\nS20\nG0 X10 Y5 Z\nS20\n");
    rig.run_to(S::Executing, 5);
    rig.tick();

    rig.station.machine_mut().sensor.fault = Some(SensorError::Bus);
    rig.run_to(S::HeatingError, 3);
    rig.run_to(S::Lock, 3);
}

#[test]
fn program_without_commands_is_a_data_error() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, "G1 X5\nM3\n; nothing to do\n");
    rig.run_to(S::DataError, 5);
    rig.run_to(S::Lock, 3);
    assert_eq!(rig.station.controller().statistics().error_count, 2);
}

#[test]
fn pause_and_continue_does_not_repeat_work() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, "S100\nS100\nS100\n");
    rig.run_to(S::Executing, 5);

    rig.run_until(|s| s.machine().job.completed == 1, 200);
    rig.send(AppCommand::Pause);
    rig.run_to(S::Paused, 2);

    let resume = rig.station.machine().job.resume.expect("progress saved");
    assert_eq!(resume.offset, 1);
    assert_eq!(resume.completed, 1);
    assert!(!rig.station.machine().axes.s.is_enabled());
    // Temperature is held while paused.
    assert!(rig.station.machine().regulator.is_enabled());

    rig.send(AppCommand::Continue);
    rig.run_to(S::Heating, 2);
    rig.run_to(S::Executing, 5);
    rig.run_to(S::NormalExit, 1_000);

    let m = rig.station.machine();
    assert_eq!(m.job.completed, 3);
    assert_eq!(m.axes.s.position(), 300, "each feed ran exactly once");
}

#[test]
fn finish_from_pause_cools_down_to_idle() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, "G0 X20 Y20 Z\nS50\nG0 X40 Y20 Z\nS50\n");
    rig.run_to(S::Executing, 5);
    rig.tick();
    rig.send(AppCommand::Pause);
    rig.run_to(S::Paused, 2);

    rig.send(AppCommand::Finish);
    rig.run_to(S::NormalExit, 2);
    rig.set_temperature(55.0);
    rig.run_to(S::Idle, 3);

    assert_eq!(rig.station.controller().statistics().task_completed_count, 1);
    assert!(rig.station.machine().job.resume.is_none());
}

#[test]
fn slow_cooldown_is_an_error() {
    let mut rig = Rig::idle(test_config());
    start_job(&mut rig, "G0 X1 Y1\n");
    rig.run_to(S::Executing, 5);
    rig.run_to(S::NormalExit, 500);

    // Tip stays hot past the cooldown timeout.
    rig.run_to(S::HeatingError, 60);
    rig.run_to(S::Lock, 3);
}

#[test]
fn cancel_after_calibration() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::UploadTask(DRILL.as_bytes().to_vec()));
    rig.run_to(S::Ready, 10);
    rig.send(AppCommand::Cancel);
    rig.run_to(S::Idle, 2);
    assert_eq!(rig.station.controller().statistics().entries(S::Heating), 0);
}
