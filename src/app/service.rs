//! Station service: the hexagonal core.
//!
//! [`Station`] owns the lifecycle controller and the [`Machine`] it drives.
//! It exposes a hardware-agnostic API.  All I/O flows through the port
//! traits the machine was built from, so the whole service runs against
//! simulated drivers on the host.
//!
//! ```text
//!  AppCommand ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │           Station             │
//!   AxisDriver ◀──│  LifecycleController · Machine│
//! HeaterDriver ◀──│  (hooks in fsm::states)       │
//! TemperatureSource ─▶                           │
//!                 └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::error::Error;
use crate::fsm::context::Machine;
use crate::fsm::states::register_hooks;
use crate::fsm::{LifecycleController, LifecycleEvent, LifecycleState, TickOutcome};
use crate::motion::AxisSet;
use crate::program::buffer::ProgramBuffer;

use super::commands::AppCommand;
use super::events::{AppEvent, StatusReport};
use super::ports::{AxisDriver, EventSink, HeaterDriver, TemperatureSource};

pub struct Station<D, H, T> {
    fsm: LifecycleController<Machine<D, H, T>>,
    machine: Machine<D, H, T>,
}

impl<D, H, T> Station<D, H, T>
where
    D: AxisDriver + 'static,
    H: HeaterDriver + 'static,
    T: TemperatureSource + 'static,
{
    /// Validate `config` and wire the hooks.
    ///
    /// Axis drivers are given in X, Y, Z, S order.  Does **not** start the
    /// controller; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, axes: [D; 4], heater: H, sensor: T) -> Result<Self, Error> {
        config.validate()?;
        let [x, y, z, s] = axes;
        let axes = AxisSet::new(x, y, z, s, &config);
        let mut fsm = LifecycleController::new(config.lifecycle.clone());
        register_hooks(&mut fsm);
        Ok(Self {
            fsm,
            machine: Machine::new(config, axes, heater, sensor),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.machine, now_ms);
        sink.emit(&AppEvent::Started(self.fsm.state()));
        info!("Station started in {}", self.fsm.state());
    }

    /// Run one control cycle.  Call every `tick_period_ms`.
    pub fn tick(&mut self, now_ms: u64, sink: &mut impl EventSink) -> TickOutcome {
        let outcome = self.fsm.tick(&mut self.machine, now_ms);
        match outcome {
            TickOutcome::Transitioned { from, to, event } => {
                sink.emit(&AppEvent::StateChanged { from, to, event });
            }
            TickOutcome::Rejected { state, event } => {
                sink.emit(&AppEvent::TransitionRejected { state, event });
            }
            TickOutcome::NoEvent | TickOutcome::Stopped => {}
        }
        outcome
    }

    // ── Command handling ──────────────────────────────────────

    /// Translate an operator command into lifecycle events.
    ///
    /// Upload failures are returned.  Commands that do not apply in the
    /// current state are left to the transition table to reject.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<(), Error> {
        let state = self.fsm.state();
        match cmd {
            AppCommand::UploadTask(program) => {
                if state != LifecycleState::Idle {
                    warn!("Station: upload refused in {}", state);
                    return Ok(());
                }
                self.machine.program.store(&program)?;
                info!("Station: task uploaded ({} bytes)", program.len());
                self.machine.job.calibration_only = false;
                self.post(LifecycleEvent::TaskSent, sink);
            }
            AppCommand::SelectManual => self.post(LifecycleEvent::SelectManual, sink),
            AppCommand::ExitManual => self.post(LifecycleEvent::ExitManual, sink),
            AppCommand::Jog { axis, delta } => {
                if state == LifecycleState::ManualControl {
                    self.machine.axes.axis_mut(axis).nudge_target(delta);
                } else {
                    warn!("Station: jog ignored in {}", state);
                }
            }
            AppCommand::RequestCalibration => {
                if state == LifecycleState::Idle {
                    self.machine.job.calibration_only = true;
                }
                self.post(LifecycleEvent::RequestCalibration, sink);
            }
            AppCommand::Approve => self.post(LifecycleEvent::TaskApproved, sink),
            AppCommand::Cancel => self.post(LifecycleEvent::CancelTask, sink),
            AppCommand::Pause => self.post(LifecycleEvent::PauseRequest, sink),
            AppCommand::Continue => self.post(LifecycleEvent::ContinueTask, sink),
            AppCommand::Finish => self.post(LifecycleEvent::ExitRequest, sink),
            AppCommand::Stop => {
                self.fsm.stop();
                let off = self.machine.all_off();
                sink.emit(&AppEvent::Stopped(state));
                off?;
            }
        }
        Ok(())
    }

    fn post(&mut self, event: LifecycleEvent, sink: &mut impl EventSink) {
        if self.fsm.post_event(event).is_err() {
            sink.emit(&AppEvent::EventDropped(event));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, now_ms: u64) -> StatusReport {
        let job = &self.machine.job;
        let sequencer = job.sequencer.as_ref();
        StatusReport {
            state: self.fsm.state(),
            color: self.fsm.state().color(),
            time_in_state_ms: self.fsm.time_in_state(now_ms),
            sequencer: sequencer.map(|s| s.state()),
            completed: job.completed,
            progress_percent: sequencer.map_or(0, |s| s.progress_percent()),
            temperature_c: job.temperature_c,
            target_c: self.machine.regulator.target(),
            heater_duty: self.machine.regulator.power(),
            pending_events: self.fsm.pending_events(),
            statistics: self.fsm.statistics().clone(),
        }
    }

    /// Emit a [`StatusReport`] through `sink`.
    pub fn report_status(&self, now_ms: u64, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Status(self.status(now_ms)));
    }

    pub fn state(&self) -> LifecycleState {
        self.fsm.state()
    }

    pub fn controller(&self) -> &LifecycleController<Machine<D, H, T>> {
        &self.fsm
    }

    pub fn machine(&self) -> &Machine<D, H, T> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine<D, H, T> {
        &mut self.machine
    }

    /// Producer handle for the network side.
    pub fn program_buffer(&self) -> ProgramBuffer {
        self.machine.program.clone()
    }
}
