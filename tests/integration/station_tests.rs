//! Station command surface: uploads, queue overflow, manual jogging,
//! status reporting and emergency stop.

use solderbot::app::commands::AppCommand;
use solderbot::app::events::AppEvent;
use solderbot::error::{Error, ProgramError};
use solderbot::fsm::{EVENT_QUEUE_CAPACITY, LifecycleEvent, LifecycleState as S, TickOutcome};
use solderbot::motion::AxisId;

use super::mock_hw::{Rig, test_config};

#[test]
fn upload_is_refused_outside_idle() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::SelectManual);
    rig.run_to(S::ManualControl, 2);

    rig.send(AppCommand::UploadTask(b"S10\n".to_vec()));
    assert_eq!(
        rig.station.program_buffer().snapshot(),
        Err(ProgramError::Empty)
    );
    assert_eq!(rig.station.controller().pending_events(), 0);
}

#[test]
fn oversize_upload_is_an_error() {
    let mut config = test_config();
    config.program.max_program_bytes = 16;
    let mut rig = Rig::idle(config);

    let result = rig
        .station
        .handle_command(AppCommand::UploadTask(vec![b'S'; 17]), &mut rig.sink);
    assert_eq!(result, Err(Error::Program(ProgramError::TooLarge)));

    rig.tick();
    assert_eq!(rig.state(), S::Idle);
}

#[test]
fn queue_overflow_is_reported() {
    let mut rig = Rig::idle(test_config());
    for _ in 0..=EVENT_QUEUE_CAPACITY {
        rig.send(AppCommand::Pause);
    }

    assert_eq!(rig.station.controller().pending_events(), EVENT_QUEUE_CAPACITY);
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::EventDropped(LifecycleEvent::PauseRequest))
    );

    // Each queued event is rejected by Idle, one per tick.
    for _ in 0..EVENT_QUEUE_CAPACITY {
        assert_eq!(
            rig.tick(),
            TickOutcome::Rejected {
                state: S::Idle,
                event: LifecycleEvent::PauseRequest
            }
        );
    }
    assert_eq!(rig.tick(), TickOutcome::NoEvent);
}

#[test]
fn status_report_serializes() {
    let rig = Rig::idle(test_config());
    let report = rig.station.status(rig.now);
    let json = serde_json::to_string(&report).expect("serializable");
    assert!(json.contains("\"state\":\"Idle\""), "{json}");
    assert!(json.contains("\"pending_events\":0"), "{json}");
}

#[test]
fn jog_moves_the_axis_in_manual() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::SelectManual);
    rig.run_to(S::ManualControl, 2);

    rig.send(AppCommand::Jog {
        axis: AxisId::Y,
        delta: 150,
    });
    rig.tick();
    rig.tick();

    let y = &rig.station.machine().axes.y;
    assert_eq!(y.position(), 150);
    assert_eq!(y.driver().pulses, 150);
    assert!(y.driver().enabled);

    rig.send(AppCommand::ExitManual);
    rig.run_to(S::Idle, 2);
    assert!(!rig.station.machine().axes.y.driver().enabled);
}

#[test]
fn stop_halts_the_controller() {
    let mut rig = Rig::idle(test_config());
    rig.send(AppCommand::UploadTask(b"S10\n".to_vec()));
    rig.run_to(S::Ready, 10);

    rig.send(AppCommand::Stop);
    assert!(!rig.station.controller().is_running());
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Stopped(S::Ready))
    );

    rig.send(AppCommand::Approve);
    assert_eq!(rig.tick(), TickOutcome::Stopped);
    assert_eq!(rig.state(), S::Ready);
    assert!(!rig.station.machine().regulator.heater().enabled);
}
