//! In-memory drivers for host runs and tests.
//!
//! [`SimAxis`] counts pulses and tracks a physical position so limit
//! switches can be placed along its travel.  [`ThermalModel`] couples a
//! [`SimHeater`] to a [`SimThermometer`] with a first-order heating and
//! loss model, advanced by a fixed step on every temperature read.

use std::cell::RefCell;
use std::rc::Rc;

use crate::app::ports::{AxisDriver, HeaterDriver, TemperatureSource};
use crate::error::{AxisError, HeaterError, SensorError};
use crate::motion::Direction;

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Limit {
    None,
    /// Triggers once the physical position passes `at` while travelling `dir`.
    At { dir: Direction, at: i64 },
    /// Fitted but never triggers.
    Dead,
}

#[derive(Debug, Clone)]
pub struct SimAxis {
    enabled: bool,
    direction: Direction,
    physical: i64,
    pulses: u64,
    last_period_us: u32,
    limit: Limit,
    fail_pins: bool,
}

impl Default for SimAxis {
    fn default() -> Self {
        Self::new()
    }
}

impl SimAxis {
    pub fn new() -> Self {
        Self {
            enabled: false,
            direction: Direction::Forward,
            physical: 0,
            pulses: 0,
            last_period_us: 0,
            limit: Limit::None,
            fail_pins: false,
        }
    }

    /// Axis with a switch at physical position `at`, reached travelling `dir`.
    pub fn with_limit(dir: Direction, at: i64) -> Self {
        Self {
            limit: Limit::At { dir, at },
            ..Self::new()
        }
    }

    /// Axis whose switch is fitted but broken.
    pub fn with_dead_limit() -> Self {
        Self {
            limit: Limit::Dead,
            ..Self::new()
        }
    }

    pub fn fail_pins(&mut self, fail: bool) {
        self.fail_pins = fail;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Net pulses, Forward positive.
    pub fn physical_position(&self) -> i64 {
        self.physical
    }

    /// Total pulses emitted in either direction.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn last_period_us(&self) -> u32 {
        self.last_period_us
    }

    fn check(&self) -> Result<(), AxisError> {
        if self.fail_pins {
            Err(AxisError::PinWriteFailed)
        } else {
            Ok(())
        }
    }
}

impl AxisDriver for SimAxis {
    fn set_enabled(&mut self, on: bool) -> Result<(), AxisError> {
        self.check()?;
        self.enabled = on;
        Ok(())
    }

    fn set_direction(&mut self, dir: Direction) -> Result<(), AxisError> {
        self.check()?;
        self.direction = dir;
        Ok(())
    }

    fn step_pulses(&mut self, count: u32, period_us: u32) -> Result<(), AxisError> {
        self.check()?;
        let delta = i64::from(count);
        self.physical += match self.direction {
            Direction::Forward => delta,
            Direction::Reverse => -delta,
        };
        self.pulses += u64::from(count);
        self.last_period_us = period_us;
        Ok(())
    }

    fn has_limit_switch(&self) -> bool {
        !matches!(self.limit, Limit::None)
    }

    fn limit_triggered(&mut self) -> Result<bool, AxisError> {
        Ok(match self.limit {
            Limit::None | Limit::Dead => false,
            Limit::At {
                dir: Direction::Reverse,
                at,
            } => self.physical <= at,
            Limit::At {
                dir: Direction::Forward,
                at,
            } => self.physical >= at,
        })
    }
}

// ---------------------------------------------------------------------------
// Thermal model
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ThermalState {
    temperature: f32,
    ambient: f32,
    duty: f32,
    heater_on: bool,
    /// °C per second at 100 % duty.
    heat_rate: f32,
    /// Fraction of the excess over ambient lost per second.
    loss: f32,
    step_secs: f32,
    sensor_fault: Option<SensorError>,
    fail_pwm: bool,
}

/// Shared heater and sensor plant.  Clones refer to the same plant.
#[derive(Debug, Clone)]
pub struct ThermalModel(Rc<RefCell<ThermalState>>);

impl ThermalModel {
    pub fn new(ambient: f32) -> Self {
        Self(Rc::new(RefCell::new(ThermalState {
            temperature: ambient,
            ambient,
            duty: 0.0,
            heater_on: false,
            heat_rate: 40.0,
            loss: 0.02,
            step_secs: 0.1,
            sensor_fault: None,
            fail_pwm: false,
        })))
    }

    pub fn heater(&self) -> SimHeater {
        SimHeater(self.clone())
    }

    pub fn thermometer(&self) -> SimThermometer {
        SimThermometer(self.clone())
    }

    pub fn temperature(&self) -> f32 {
        self.0.borrow().temperature
    }

    pub fn set_temperature(&self, t: f32) {
        self.0.borrow_mut().temperature = t;
    }

    /// Make every subsequent read fail with `fault` (or succeed on `None`).
    pub fn set_sensor_fault(&self, fault: Option<SensorError>) {
        self.0.borrow_mut().sensor_fault = fault;
    }

    pub fn set_pwm_failure(&self, fail: bool) {
        self.0.borrow_mut().fail_pwm = fail;
    }

    fn advance(&self) {
        let mut s = self.0.borrow_mut();
        let drive = if s.heater_on { s.duty / 100.0 } else { 0.0 };
        let dt = s.step_secs;
        let gain = drive * s.heat_rate * dt;
        let lost = (s.temperature - s.ambient) * s.loss * dt;
        s.temperature += gain - lost;
    }
}

#[derive(Debug, Clone)]
pub struct SimHeater(ThermalModel);

impl Default for SimHeater {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHeater {
    /// Heater on its own private plant.
    pub fn new() -> Self {
        ThermalModel::new(25.0).heater()
    }

    pub fn duty(&self) -> f32 {
        self.0.0.borrow().duty
    }

    pub fn is_enabled(&self) -> bool {
        self.0.0.borrow().heater_on
    }
}

impl HeaterDriver for SimHeater {
    fn set_duty(&mut self, percent: f32) -> Result<(), HeaterError> {
        let mut s = self.0.0.borrow_mut();
        if s.fail_pwm {
            return Err(HeaterError::PwmWriteFailed);
        }
        s.duty = percent.clamp(0.0, 100.0);
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), HeaterError> {
        self.0.0.borrow_mut().heater_on = on;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimThermometer(ThermalModel);

impl TemperatureSource for SimThermometer {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        if let Some(fault) = self.0.0.borrow().sensor_fault {
            return Err(fault);
        }
        self.0.advance();
        Ok(self.0.temperature())
    }
}
