//! Soldering-tip heater on a logic-level MOSFET.
//!
//! Duty is written through `embedded_hal::pwm::SetDutyCycle` (an LEDC
//! channel on the ESP32).  "Disabled" holds the channel at 0 % regardless
//! of the last requested duty.

use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::HeaterDriver;
use crate::error::HeaterError;

pub struct PwmHeater<P> {
    pwm: P,
    enabled: bool,
    duty: f32,
}

impl<P: SetDutyCycle> PwmHeater<P> {
    pub fn new(mut pwm: P) -> Result<Self, HeaterError> {
        pwm.set_duty_cycle_fully_off()
            .map_err(|_| HeaterError::PwmWriteFailed)?;
        Ok(Self {
            pwm,
            enabled: false,
            duty: 0.0,
        })
    }

    /// Last requested duty (0–100 %).
    pub fn duty(&self) -> f32 {
        self.duty
    }

    fn apply(&mut self) -> Result<(), HeaterError> {
        let percent = if self.enabled { self.duty } else { 0.0 };
        let max = self.pwm.max_duty_cycle();
        let raw = (f32::from(max) * percent / 100.0) as u16;
        self.pwm
            .set_duty_cycle(raw.min(max))
            .map_err(|_| HeaterError::PwmWriteFailed)
    }
}

impl<P: SetDutyCycle> HeaterDriver for PwmHeater<P> {
    fn set_duty(&mut self, percent: f32) -> Result<(), HeaterError> {
        self.duty = percent.clamp(0.0, 100.0);
        self.apply()
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), HeaterError> {
        self.enabled = on;
        self.apply()
    }
}
