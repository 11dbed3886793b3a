//! STEP/DIR stepper channel (A4988 / DRV8825 class drivers).
//!
//! Generic over `embedded-hal` 1.0 pins and delay so the same driver runs
//! on ESP-IDF `PinDriver`s and on host mocks.
//!
//! - STEP: rising edge advances one microstep.
//! - DIR: HIGH = [`Direction::Forward`].
//! - nENABLE: active LOW.
//! - Limit switch (optional): active LOW, internal pull-up.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::AxisDriver;
use crate::error::AxisError;
use crate::motion::Direction;

/// Minimum STEP high time (µs).  Both driver families need ≥ 2 µs.
const STEP_PULSE_US: u32 = 2;

pub struct StepperDriver<STEP, DIR, EN, LIM, DELAY> {
    step: STEP,
    dir: DIR,
    enable: EN,
    limit: Option<LIM>,
    delay: DELAY,
}

impl<STEP, DIR, EN, LIM, DELAY> StepperDriver<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    /// Build a channel.  The coils start released.
    pub fn new(
        step: STEP,
        dir: DIR,
        mut enable: EN,
        limit: Option<LIM>,
        delay: DELAY,
    ) -> Result<Self, AxisError> {
        enable.set_high().map_err(|_| AxisError::PinWriteFailed)?;
        Ok(Self {
            step,
            dir,
            enable,
            limit,
            delay,
        })
    }

    fn pulse(&mut self, period_us: u32) -> Result<(), AxisError> {
        self.step.set_high().map_err(|_| AxisError::PinWriteFailed)?;
        self.delay.delay_us(STEP_PULSE_US);
        self.step.set_low().map_err(|_| AxisError::PinWriteFailed)?;
        self.delay.delay_us(period_us.saturating_sub(STEP_PULSE_US));
        Ok(())
    }
}

impl<STEP, DIR, EN, LIM, DELAY> AxisDriver for StepperDriver<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    fn set_enabled(&mut self, on: bool) -> Result<(), AxisError> {
        let res = if on {
            self.enable.set_low()
        } else {
            self.enable.set_high()
        };
        res.map_err(|_| AxisError::PinWriteFailed)
    }

    fn set_direction(&mut self, dir: Direction) -> Result<(), AxisError> {
        let res = match dir {
            Direction::Forward => self.dir.set_high(),
            Direction::Reverse => self.dir.set_low(),
        };
        res.map_err(|_| AxisError::PinWriteFailed)
    }

    fn step_pulses(&mut self, count: u32, period_us: u32) -> Result<(), AxisError> {
        for _ in 0..count {
            self.pulse(period_us)?;
        }
        Ok(())
    }

    fn has_limit_switch(&self) -> bool {
        self.limit.is_some()
    }

    fn limit_triggered(&mut self) -> Result<bool, AxisError> {
        match self.limit.as_mut() {
            Some(pin) => pin.is_low().map_err(|_| AxisError::LimitReadFailed),
            None => Ok(false),
        }
    }
}
