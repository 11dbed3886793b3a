//! PID temperature regulator for the soldering tip.
//!
//! Converts a tip temperature reading and a setpoint into a heater duty
//! cycle.  The integral accumulator is clamped to a symmetric band
//! (anti-windup) and reset whenever the setpoint changes or the loop is
//! re-enabled, so a retarget never starts from stale accumulated error.

use log::{debug, info, warn};

use crate::app::ports::HeaterDriver;
use crate::config::PidConfig;
use crate::error::HeaterError;

const OUTPUT_MIN: f32 = 0.0;
const OUTPUT_MAX: f32 = 100.0;

/// Closed-loop heater controller.
pub struct TemperatureRegulator<H> {
    heater: H,
    kp: f32,
    ki: f32,
    kd: f32,
    target: f32,
    integral: f32,
    integral_limit: f32,
    last_error: f32,
    last_update_ms: Option<u64>,
    min_temp: f32,
    max_temp: f32,
    min_update_interval_ms: u64,
    enabled: bool,
    power: f32,
}

impl<H: HeaterDriver> TemperatureRegulator<H> {
    pub fn new(heater: H, config: &PidConfig) -> Self {
        Self {
            heater,
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            target: 0.0,
            integral: 0.0,
            integral_limit: config.integral_limit.abs(),
            last_error: 0.0,
            last_update_ms: None,
            min_temp: config.min_temperature_c,
            max_temp: config.max_temperature_c,
            min_update_interval_ms: u64::from(config.min_update_interval_ms),
            enabled: false,
            power: 0.0,
        }
    }

    /// Set the setpoint, clamped to the configured band.
    pub fn set_target(&mut self, temp: f32) {
        if !temp.is_finite() {
            warn!("HEATER: non-finite target ignored");
            return;
        }
        let clamped = temp.clamp(self.min_temp, self.max_temp);
        if (clamped - self.target).abs() > f32::EPSILON {
            self.reset();
            info!("HEATER: target {:.1}°C", clamped);
        }
        self.target = clamped;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Turn the loop on or off.  Off forces zero output immediately.
    pub fn set_enabled(&mut self, on: bool) -> Result<(), HeaterError> {
        if on {
            self.reset();
            self.heater.set_enabled(true)?;
        } else {
            self.power = 0.0;
            self.heater.set_duty(0.0)?;
            self.heater.set_enabled(false)?;
        }
        self.enabled = on;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run one control step and apply the result to the heater.
    ///
    /// Returns the duty cycle now in effect.  Calls closer together than
    /// the minimum interval leave the output untouched.
    pub fn update(&mut self, current: f32, now_ms: u64) -> Result<f32, HeaterError> {
        if !current.is_finite() {
            warn!("HEATER: non-finite reading skipped");
            return Ok(self.power);
        }
        if !self.enabled || self.target <= 0.0 {
            if self.power != 0.0 {
                self.power = 0.0;
                self.heater.set_duty(0.0)?;
            }
            return Ok(0.0);
        }

        let dt = match self.last_update_ms {
            Some(last) => {
                let elapsed = now_ms.saturating_sub(last);
                if elapsed < self.min_update_interval_ms {
                    return Ok(self.power);
                }
                Some(elapsed as f32 / 1000.0)
            }
            None => None,
        };

        let error = self.target - current;
        let p = self.kp * error;

        let (i, d) = match dt {
            Some(dt) => {
                self.integral = (self.integral + error * dt)
                    .clamp(-self.integral_limit, self.integral_limit);
                (self.ki * self.integral, self.kd * (error - self.last_error) / dt)
            }
            None => (self.ki * self.integral, 0.0),
        };

        self.last_error = error;
        self.last_update_ms = Some(now_ms);

        let output = (p + i + d).clamp(OUTPUT_MIN, OUTPUT_MAX);
        debug!(
            "HEATER: t={:.1} err={:.1} p={:.1} i={:.1} d={:.1} out={:.1}",
            current, error, p, i, d, output
        );
        self.power = output;
        self.heater.set_duty(output)?;
        Ok(output)
    }

    /// Duty cycle currently applied (0–100 %).
    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn gains(&self) -> (f32, f32, f32) {
        (self.kp, self.ki, self.kd)
    }

    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    pub fn heater(&self) -> &H {
        &self.heater
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_update_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::drivers::sim::SimHeater;

    fn regulator() -> TemperatureRegulator<SimHeater> {
        TemperatureRegulator::new(SimHeater::new(), &SystemConfig::default().pid)
    }

    #[test]
    fn disabled_outputs_zero() {
        let mut r = regulator();
        r.set_target(300.0);
        assert_eq!(r.update(20.0, 0).unwrap(), 0.0);
        assert_eq!(r.heater().duty(), 0.0);
    }

    #[test]
    fn zero_target_outputs_zero() {
        let mut r = regulator();
        r.set_enabled(true).unwrap();
        assert_eq!(r.update(20.0, 0).unwrap(), 0.0);
    }

    #[test]
    fn cold_tip_saturates_high() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        assert_eq!(r.update(20.0, 0).unwrap(), 100.0);
        assert!(r.heater().is_enabled());
        assert_eq!(r.heater().duty(), 100.0);
    }

    #[test]
    fn overshoot_clamps_low() {
        let mut r = regulator();
        r.set_target(200.0);
        r.set_enabled(true).unwrap();
        assert_eq!(r.update(400.0, 0).unwrap(), 0.0);
    }

    #[test]
    fn target_clamped_to_band() {
        let mut r = regulator();
        r.set_target(9_999.0);
        assert_eq!(r.target(), 450.0);
        r.set_target(-20.0);
        assert_eq!(r.target(), 0.0);
    }

    #[test]
    fn retarget_resets_integral() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        for t in 0..20 {
            r.update(320.0, t * 100).unwrap();
        }
        assert!(r.integral() > 0.0);
        r.set_target(300.0);
        assert_eq!(r.integral(), 0.0);
    }

    #[test]
    fn same_target_keeps_integral() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        for t in 0..5 {
            r.update(320.0, t * 100).unwrap();
        }
        let before = r.integral();
        r.set_target(330.0);
        assert_eq!(r.integral(), before);
    }

    #[test]
    fn short_interval_is_skipped() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        r.update(300.0, 1_000).unwrap();
        let integral = r.integral();
        let out = r.update(100.0, 1_005).unwrap();
        assert_eq!(r.integral(), integral);
        assert_eq!(out, r.power());
    }

    #[test]
    fn disable_forces_zero_power() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        r.update(20.0, 0).unwrap();
        r.set_enabled(false).unwrap();
        assert_eq!(r.power(), 0.0);
        assert_eq!(r.heater().duty(), 0.0);
        assert!(!r.heater().is_enabled());
    }

    #[test]
    fn integral_stays_in_band_under_long_error() {
        let mut r = regulator();
        r.set_target(450.0);
        r.set_enabled(true).unwrap();
        for t in 0..10_000u64 {
            r.update(0.0, t * 100).unwrap();
        }
        assert!(r.integral() <= SystemConfig::default().pid.integral_limit);
    }

    #[test]
    fn non_finite_reading_leaves_state_untouched() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_enabled(true).unwrap();
        r.update(300.0, 0).unwrap();
        let before = (r.power(), r.integral());

        for (i, bad) in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY].into_iter().enumerate() {
            let out = r.update(bad, 1_000 * (i as u64 + 1)).unwrap();
            assert_eq!(out, before.0);
        }
        assert_eq!((r.power(), r.integral()), before);

        let out = r.update(320.0, 5_000).unwrap();
        assert!(out.is_finite() && (0.0..=100.0).contains(&out));
        assert!(r.integral().is_finite());
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut r = regulator();
        r.set_target(330.0);
        r.set_target(f32::NAN);
        assert_eq!(r.target(), 330.0);
    }

    #[test]
    fn gains_are_settable() {
        let mut r = regulator();
        r.set_gains(1.0, 2.0, 3.0);
        assert_eq!(r.gains(), (1.0, 2.0, 3.0));
    }
}
