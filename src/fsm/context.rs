//! The machine the lifecycle hooks act on.
//!
//! `Machine` is the single struct every hook receives.  It owns the four
//! axes, the heater regulator, the tip sensor, a handle to the shared
//! program buffer and the bookkeeping of the current job.  Nothing in
//! here is global; a second station is just a second `Machine`.

use log::{debug, warn};

use crate::app::ports::{AxisDriver, HeaterDriver, TemperatureSource};
use crate::config::SystemConfig;
use crate::control::pid::TemperatureRegulator;
use crate::error::{Error, SensorError};
use crate::motion::AxisSet;
use crate::motion::sequencer::{ExecutionSequencer, ResumePoint};
use crate::program::buffer::ProgramBuffer;

// ---------------------------------------------------------------------------
// Job bookkeeping
// ---------------------------------------------------------------------------

/// State of the job in progress, if any.
#[derive(Default)]
pub struct JobState {
    /// Built on entry to `Executing`.
    pub sequencer: Option<ExecutionSequencer>,
    /// Saved by `Paused`; consumed when `Executing` rebuilds the sequencer.
    pub resume: Option<ResumePoint>,
    /// The current calibration was requested on its own, not for a task.
    pub calibration_only: bool,
    /// Last successful sensor reading.
    pub temperature_c: Option<f32>,
    /// Points or commands finished by the most recent job.
    pub completed: u32,
}

impl JobState {
    /// Forget the job.  The last reading and completed count survive.
    pub fn clear(&mut self) {
        self.sequencer = None;
        self.resume = None;
        self.calibration_only = false;
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

pub struct Machine<D, H, T> {
    pub config: SystemConfig,
    pub axes: AxisSet<D>,
    pub regulator: TemperatureRegulator<H>,
    pub sensor: T,
    pub program: ProgramBuffer,
    pub job: JobState,
}

impl<D, H, T> Machine<D, H, T>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    pub fn new(config: SystemConfig, axes: AxisSet<D>, heater: H, sensor: T) -> Self {
        let regulator = TemperatureRegulator::new(heater, &config.pid);
        let program = ProgramBuffer::new(&config.program);
        Self {
            config,
            axes,
            regulator,
            sensor,
            program,
            job: JobState::default(),
        }
    }

    /// Heater off and every axis released.  Tries both even if one fails.
    pub fn all_off(&mut self) -> Result<(), Error> {
        let heater = self.regulator.set_enabled(false);
        let axes = self.axes.disable_all();
        if let Err(e) = heater {
            warn!("MACHINE: heater shutdown failed: {}", e);
        }
        if let Err(e) = axes {
            warn!("MACHINE: axis shutdown failed: {}", e);
        }
        heater?;
        axes?;
        Ok(())
    }

    /// Read the tip and remember the result.
    pub fn read_temperature(&mut self) -> Result<f32, SensorError> {
        match self.sensor.read_celsius() {
            Ok(t) => {
                self.job.temperature_c = Some(t);
                Ok(t)
            }
            Err(e) => {
                self.job.temperature_c = None;
                Err(e)
            }
        }
    }

    /// One regulation step: read the sensor, update the heater.
    pub fn regulate(&mut self, now_ms: u64) -> Result<f32, Error> {
        let t = self.read_temperature()?;
        let duty = self.regulator.update(t, now_ms)?;
        debug!("HEATING: {:.1}°C duty {:.0}%", t, duty);
        Ok(t)
    }

    /// Whether `t` is within tolerance of the configured setpoint.
    pub fn at_setpoint(&self, t: f32) -> bool {
        let h = &self.config.heating;
        (t - h.target_temperature_c).abs() <= h.tolerance_c
    }
}
