//! System configuration parameters
//!
//! All tunable parameters for the SolderBot station, grouped by subsystem.
//! Every group is serde-serialisable so the whole set can be shipped over
//! the control API or stored as a blob.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::motion::Direction;
use crate::motion::ramp::RampProfile;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub lifecycle: LifecycleConfig,
    pub heating: HeatingConfig,
    pub pid: PidConfig,
    pub axis_x: AxisConfig,
    pub axis_y: AxisConfig,
    pub axis_z: AxisConfig,
    /// Solder-feed axis.
    pub axis_s: AxisConfig,
    pub execution: ExecutionConfig,
    pub program: ProgramConfig,
}

/// Lifecycle engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Control task period (milliseconds).
    pub tick_period_ms: u32,
    /// Log every processed event and transition.
    pub enable_logging: bool,
    /// Collect per-state statistics.
    pub enable_statistics: bool,
}

/// Heating and cooldown policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatingConfig {
    /// Soldering tip setpoint (°C).
    pub target_temperature_c: f32,
    /// Band around the setpoint that counts as "reached" (±°C).
    pub tolerance_c: f32,
    /// Maximum time allowed to reach the setpoint.
    pub heating_timeout_ms: u32,
    /// Temperature below which the tip is considered safe after a job (°C).
    pub cooldown_safe_temperature_c: f32,
    /// Maximum time allowed to cool below the safe temperature.
    pub cooldown_timeout_ms: u32,
}

/// Temperature regulator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Integral accumulator is clamped to `[-integral_limit, integral_limit]`.
    pub integral_limit: f32,
    /// Lowest accepted setpoint (°C).
    pub min_temperature_c: f32,
    /// Highest accepted setpoint (°C).
    pub max_temperature_c: f32,
    /// Updates closer together than this are skipped.
    pub min_update_interval_ms: u32,
}

/// Per-axis mechanics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Microsteps per millimetre of travel.
    pub steps_per_mm: u32,
    /// Driver direction that increases the position counter.
    pub positive: Direction,
    /// Upper soft limit for targets (steps).
    pub travel_limit: i32,
    /// Step-timing profile.
    pub ramp: RampProfile,
    /// Steps emitted between limit-switch polls while calibrating.
    pub calibration_burst: u32,
    /// Bursts attempted before calibration gives up.
    pub calibration_max_bursts: u32,
}

/// Geometry of one solder cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Z height used for every XY move (steps).
    pub safe_z: i32,
    /// Z height at which the tip touches the joint (steps).
    pub solder_z: i32,
    pub home_x: i32,
    pub home_y: i32,
    pub home_z: i32,
    /// Maximum steps any one axis may take per control tick.
    pub step_budget: u32,
    /// Pause after arriving over a point before lowering.
    pub settle_ms: u32,
    /// Pause after lowering or feeding in program mode.
    pub dwell_ms: u32,
    /// Feed steps = solder duration (ms) / divisor.
    pub feed_divisor: u32,
}

/// Program upload and interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Feed amount used by a bare `S` token (steps).
    pub default_feed_steps: u32,
    /// Largest accepted upload (bytes).
    pub max_program_bytes: usize,
    /// Timeout for acquiring the shared program buffer.
    pub lock_timeout_ms: u32,
    /// Solder time assigned to points imported from drill files.
    pub default_solder_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let xy = AxisConfig {
            steps_per_mm: 400,
            positive: Direction::Forward,
            travel_limit: 80_000, // 200 mm
            ramp: RampProfile::default(),
            calibration_burst: 64,
            calibration_max_bursts: 2_000,
        };
        Self {
            lifecycle: LifecycleConfig {
                tick_period_ms: 100, // 10 Hz
                enable_logging: true,
                enable_statistics: true,
            },
            heating: HeatingConfig {
                target_temperature_c: 330.0,
                tolerance_c: 5.0,
                heating_timeout_ms: 120_000,
                cooldown_safe_temperature_c: 60.0,
                cooldown_timeout_ms: 300_000,
            },
            pid: PidConfig {
                kp: 4.0,
                ki: 0.2,
                kd: 1.0,
                integral_limit: 200.0,
                min_temperature_c: 0.0,
                max_temperature_c: 450.0,
                min_update_interval_ms: 10,
            },
            axis_x: xy.clone(),
            axis_y: AxisConfig {
                positive: Direction::Reverse, // mirrored belt on Y
                ..xy.clone()
            },
            axis_z: AxisConfig {
                travel_limit: 24_000, // 60 mm
                ..xy
            },
            axis_s: AxisConfig {
                steps_per_mm: 100,
                positive: Direction::Forward,
                travel_limit: i32::MAX,
                ramp: RampProfile::default(),
                calibration_burst: 64,
                calibration_max_bursts: 0,
            },
            execution: ExecutionConfig {
                safe_z: 16_000,
                solder_z: 18_000,
                home_x: 0,
                home_y: 0,
                home_z: 0,
                step_budget: 64,
                settle_ms: 200,
                dwell_ms: 300,
                feed_divisor: 10,
            },
            program: ProgramConfig {
                default_feed_steps: 50,
                max_program_bytes: 64 * 1024,
                lock_timeout_ms: 5_000,
                default_solder_ms: 1_500,
            },
        }
    }
}

impl SystemConfig {
    /// Reject values that would make the machine misbehave.
    pub fn validate(&self) -> Result<(), Error> {
        if self.lifecycle.tick_period_ms == 0 {
            return Err(Error::Config("tick period must be non-zero"));
        }
        let h = &self.heating;
        if h.tolerance_c <= 0.0 {
            return Err(Error::Config("heating tolerance must be positive"));
        }
        if h.cooldown_safe_temperature_c >= h.target_temperature_c {
            return Err(Error::Config("cooldown temperature must be below target"));
        }
        let p = &self.pid;
        if p.min_temperature_c > p.max_temperature_c {
            return Err(Error::Config("PID temperature band inverted"));
        }
        if p.integral_limit < 0.0 {
            return Err(Error::Config("integral limit must be non-negative"));
        }
        if h.target_temperature_c > p.max_temperature_c {
            return Err(Error::Config("heating target above regulator maximum"));
        }
        for axis in [&self.axis_x, &self.axis_y, &self.axis_z, &self.axis_s] {
            if axis.steps_per_mm == 0 {
                return Err(Error::Config("steps_per_mm must be non-zero"));
            }
            if axis.travel_limit < 0 {
                return Err(Error::Config("travel limit must be non-negative"));
            }
            if axis.ramp.min_delay_us > axis.ramp.start_delay_us {
                return Err(Error::Config("ramp floor above start delay"));
            }
        }
        let e = &self.execution;
        if e.step_budget == 0 {
            return Err(Error::Config("step budget must be non-zero"));
        }
        if e.feed_divisor == 0 {
            return Err(Error::Config("feed divisor must be non-zero"));
        }
        if e.safe_z < 0 || e.solder_z < 0 || e.solder_z > self.axis_z.travel_limit {
            return Err(Error::Config("Z heights outside travel"));
        }
        Ok(())
    }

    /// Compact postcard encoding for persistent storage.
    pub fn to_blob(&self) -> Result<Vec<u8>, Error> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("config encode failed"))
    }

    /// Decode and validate a blob written by [`to_blob`](Self::to_blob).
    pub fn from_blob(bytes: &[u8]) -> Result<Self, Error> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("config blob malformed"))?;
        config.validate()?;
        Ok(config)
    }
}
