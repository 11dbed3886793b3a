//! GPIO / peripheral pin assignments for the SolderBot controller board.
//!
//! Single source of truth: `main` builds every driver from these numbers
//! rather than hard-coding pins.

// ---------------------------------------------------------------------------
// Stepper drivers (A4988 / DRV8825 carriers)
// ---------------------------------------------------------------------------

/// STEP, DIR, nENABLE for one axis.
#[derive(Debug, Clone, Copy)]
pub struct StepperPins {
    pub step: i32,
    pub dir: i32,
    pub enable: i32,
    /// Active-low endstop, if fitted.
    pub limit: Option<i32>,
}

pub const AXIS_X: StepperPins = StepperPins {
    step: 4,
    dir: 5,
    enable: 6,
    limit: Some(15),
};

pub const AXIS_Y: StepperPins = StepperPins {
    step: 7,
    dir: 8,
    enable: 9,
    limit: Some(16),
};

pub const AXIS_Z: StepperPins = StepperPins {
    step: 10,
    dir: 11,
    enable: 12,
    limit: Some(17),
};

/// Solder wire feeder.  No endstop.
pub const AXIS_S: StepperPins = StepperPins {
    step: 13,
    dir: 14,
    enable: 21,
    limit: None,
};

// ---------------------------------------------------------------------------
// Heater (logic-level MOSFET on the tip cartridge)
// ---------------------------------------------------------------------------

/// LEDC PWM output to the MOSFET gate.
pub const HEATER_PWM_GPIO: i32 = 1;
/// Heater PWM base frequency.  Slow enough for the MOSFET to switch fully.
pub const HEATER_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Thermocouple (MAX6675 on SPI2, read-only)
// ---------------------------------------------------------------------------

pub const THERMO_SCLK_GPIO: i32 = 36;
pub const THERMO_MISO_GPIO: i32 = 37;
/// Not connected on the MAX6675; the SPI driver still needs a pin.
pub const THERMO_MOSI_GPIO: i32 = 35;
pub const THERMO_CS_GPIO: i32 = 38;
/// MAX6675 tops out at 4.3 MHz.
pub const THERMO_SPI_HZ: u32 = 4_000_000;

