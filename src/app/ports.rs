//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Station (domain)
//! ```
//!
//! Driven adapters (stepper drivers, heater PWM, thermocouple, clock, event
//! sinks) implement these traits.  The [`Station`](super::service::Station)
//! and the motion/control primitives consume them via generics, so the
//! domain core never touches GPIO, LEDC or SPI directly.

use crate::error::{AxisError, HeaterError, SensorError};
use crate::motion::Direction;

// ───────────────────────────────────────────────────────────────
// Axis driver port (domain → stepper hardware)
// ───────────────────────────────────────────────────────────────

/// One stepper channel: STEP/DIR/ENABLE plus an optional limit switch.
pub trait AxisDriver {
    /// Energise or release the motor coils.
    fn set_enabled(&mut self, on: bool) -> Result<(), AxisError>;

    /// Latch the direction for subsequent pulses.
    fn set_direction(&mut self, dir: Direction) -> Result<(), AxisError>;

    /// Emit `count` step pulses, one every `period_us` microseconds.
    fn step_pulses(&mut self, count: u32, period_us: u32) -> Result<(), AxisError>;

    /// Whether a limit switch is fitted on this channel.
    fn has_limit_switch(&self) -> bool {
        false
    }

    /// True while the (active-low) limit switch is pressed.
    fn limit_triggered(&mut self) -> Result<bool, AxisError> {
        Ok(false)
    }
}

// ───────────────────────────────────────────────────────────────
// Heater port (domain → heater MOSFET)
// ───────────────────────────────────────────────────────────────

/// PWM-driven heating element.
pub trait HeaterDriver {
    /// Set the PWM duty cycle, 0–100 %.
    fn set_duty(&mut self, percent: f32) -> Result<(), HeaterError>;

    /// Gate the output stage.
    fn set_enabled(&mut self, on: bool) -> Result<(), HeaterError>;
}

// ───────────────────────────────────────────────────────────────
// Temperature source port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Tip temperature sensor.
pub trait TemperatureSource {
    /// Read the current temperature in °C.
    ///
    /// An unplugged sensor is reported as [`SensorError::NotConnected`],
    /// distinct from a failed bus transaction ([`SensorError::Bus`]).
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, web
/// status endpoint, display).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
