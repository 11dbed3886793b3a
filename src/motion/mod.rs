//! Per-axis motion primitive and the four-axis set.
//!
//! An [`AxisController`] owns one axis's position/target bookkeeping and
//! turns target deltas into bounded, ramped pulse trains on its
//! [`AxisDriver`].  Callers keep the control loop responsive by asking
//! for a small step budget per tick via [`AxisController::advance_toward`].
//!
//! Positions and targets are microsteps.  Targets are clamped to
//! `[0, travel_limit]` on assignment, so negative coordinates are not
//! representable.

pub mod ramp;
pub mod sequencer;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::AxisDriver;
use crate::config::{AxisConfig, SystemConfig};
use crate::error::AxisError;
use ramp::RampProfile;

/// Logical DIR pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Selects one member of an [`AxisSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisId {
    X,
    Y,
    Z,
    /// Solder feed.
    S,
}

/// Result of a calibration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// The switch triggered; position is now zero.
    Calibrated { bursts: u32 },
    /// No switch fitted; position is unchanged and must not be trusted.
    NoLimitSwitch,
}

// ---------------------------------------------------------------------------
// AxisController
// ---------------------------------------------------------------------------

pub struct AxisController<D> {
    name: &'static str,
    driver: D,
    position: i32,
    target: i32,
    enabled: bool,
    positive: Direction,
    steps_per_mm: u32,
    travel_limit: i32,
    ramp: RampProfile,
    calibration_burst: u32,
    calibration_max_bursts: u32,
}

impl<D: AxisDriver> AxisController<D> {
    pub fn new(name: &'static str, driver: D, config: &AxisConfig) -> Self {
        Self {
            name,
            driver,
            position: 0,
            target: 0,
            enabled: false,
            positive: config.positive,
            steps_per_mm: config.steps_per_mm.max(1),
            travel_limit: config.travel_limit.max(0),
            ramp: config.ramp,
            calibration_burst: config.calibration_burst.max(1),
            calibration_max_bursts: config.calibration_max_bursts,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn at_target(&self) -> bool {
        self.position == self.target
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn set_enabled(&mut self, on: bool) -> Result<(), AxisError> {
        self.driver.set_enabled(on)?;
        self.enabled = on;
        Ok(())
    }

    /// Store a new target, clamped to `[0, travel_limit]`.
    pub fn set_target(&mut self, value: i32) {
        let clamped = value.clamp(0, self.travel_limit);
        if clamped != value {
            debug!("{}: target {} clamped to {}", self.name, value, clamped);
        }
        self.target = clamped;
    }

    /// Move the target by `delta` steps from where it currently is.
    pub fn nudge_target(&mut self, delta: i32) {
        self.set_target(self.target.saturating_add(delta));
    }

    /// Step toward the target, at most `max_steps` pulses.
    ///
    /// Returns the number of steps taken.  A disabled axis does not move.
    pub fn advance_toward(&mut self, max_steps: u32) -> Result<u32, AxisError> {
        let remaining = i64::from(self.target) - i64::from(self.position);
        if remaining == 0 || max_steps == 0 {
            return Ok(0);
        }
        if !self.enabled {
            debug!("{}: advance requested while disabled", self.name);
            return Ok(0);
        }

        let count = remaining.unsigned_abs().min(u64::from(max_steps)) as u32;
        let (dir, delta) = if remaining > 0 {
            (self.positive, 1)
        } else {
            (self.positive.opposite(), -1)
        };
        self.driver.set_direction(dir)?;

        for i in 0..count {
            let period = self.ramp.delay_for_step(i, count);
            self.driver.step_pulses(1, period)?;
            self.position += delta;
        }
        Ok(count)
    }

    /// Drive toward the limit switch until it triggers, then zero.
    ///
    /// Blocks for the whole approach.  Gives up with
    /// [`AxisError::CalibrationTimeout`] after the configured number of
    /// bursts.  The enable state is restored either way.
    pub fn calibrate(&mut self) -> Result<CalibrationOutcome, AxisError> {
        if !self.driver.has_limit_switch() {
            info!("{}: no limit switch, calibration skipped", self.name);
            return Ok(CalibrationOutcome::NoLimitSwitch);
        }

        let was_enabled = self.enabled;
        self.set_enabled(true)?;
        let result = self.seek_limit();
        self.set_enabled(was_enabled)?;

        match result {
            Ok(bursts) => {
                self.position = 0;
                self.target = 0;
                info!("{}: calibrated after {} bursts", self.name, bursts);
                Ok(CalibrationOutcome::Calibrated { bursts })
            }
            Err(e) => {
                warn!("{}: calibration failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    fn seek_limit(&mut self) -> Result<u32, AxisError> {
        self.driver.set_direction(self.positive.opposite())?;
        let period = self.ramp.min_delay_us;
        let mut bursts = 0;
        loop {
            if self.driver.limit_triggered()? {
                return Ok(bursts);
            }
            if bursts >= self.calibration_max_bursts {
                return Err(AxisError::CalibrationTimeout);
            }
            self.driver.step_pulses(self.calibration_burst, period)?;
            bursts += 1;
        }
    }

    /// Millimetres to steps, truncating toward zero.
    pub fn mm_to_steps(&self, mm: f32) -> i32 {
        (mm * self.steps_per_mm as f32) as i32
    }

    /// Steps to whole millimetres, truncating toward zero.
    pub fn steps_to_mm(&self, steps: i32) -> i32 {
        steps / self.steps_per_mm as i32
    }
}

// ---------------------------------------------------------------------------
// AxisSet
// ---------------------------------------------------------------------------

/// The three positioning axes plus the solder feed.
pub struct AxisSet<D> {
    pub x: AxisController<D>,
    pub y: AxisController<D>,
    pub z: AxisController<D>,
    pub s: AxisController<D>,
}

impl<D: AxisDriver> AxisSet<D> {
    pub fn new(x: D, y: D, z: D, s: D, config: &SystemConfig) -> Self {
        Self {
            x: AxisController::new("X", x, &config.axis_x),
            y: AxisController::new("Y", y, &config.axis_y),
            z: AxisController::new("Z", z, &config.axis_z),
            s: AxisController::new("S", s, &config.axis_s),
        }
    }

    pub fn axis_mut(&mut self, id: AxisId) -> &mut AxisController<D> {
        match id {
            AxisId::X => &mut self.x,
            AxisId::Y => &mut self.y,
            AxisId::Z => &mut self.z,
            AxisId::S => &mut self.s,
        }
    }

    /// Hold every axis where it is.
    pub fn hold_position(&mut self) {
        for axis in [&mut self.x, &mut self.y, &mut self.z, &mut self.s] {
            axis.set_target(axis.position());
        }
    }

    /// Enable or disable X, Y and Z together.
    pub fn set_positioning_enabled(&mut self, on: bool) -> Result<(), AxisError> {
        self.x.set_enabled(on)?;
        self.y.set_enabled(on)?;
        self.z.set_enabled(on)
    }

    /// Release every axis.  Attempts all four even if one fails.
    pub fn disable_all(&mut self) -> Result<(), AxisError> {
        let results = [
            self.x.set_enabled(false),
            self.y.set_enabled(false),
            self.z.set_enabled(false),
            self.s.set_enabled(false),
        ];
        results.into_iter().collect()
    }

    /// Advance all four axes one budgeted chunk; true once all are at target.
    pub fn advance_all(&mut self, budget: u32) -> Result<bool, AxisError> {
        self.x.advance_toward(budget)?;
        self.y.advance_toward(budget)?;
        self.z.advance_toward(budget)?;
        self.s.advance_toward(budget)?;
        Ok(self.x.at_target() && self.y.at_target() && self.z.at_target() && self.s.at_target())
    }
}
