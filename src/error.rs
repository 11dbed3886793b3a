//! Unified error types for the SolderBot firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! hook layer's error handling uniform.  All variants are `Copy` so they
//! can be passed through hook results and logged without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A motion axis failed or could not complete an operation.
    Axis(AxisError),
    /// The temperature source could not produce a reading.
    Sensor(SensorError),
    /// The heater output could not be driven.
    Heater(HeaterError),
    /// The uploaded program could not be loaded.
    Program(ProgramError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Axis(e) => write!(f, "axis: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Heater(e) => write!(f, "heater: {e}"),
            Self::Program(e) => write!(f, "program: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Axis errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisError {
    /// STEP/DIR/ENABLE pin write failed.
    PinWriteFailed,
    /// Limit switch read failed.
    LimitReadFailed,
    /// The limit switch never triggered within the configured burst budget.
    CalibrationTimeout,
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinWriteFailed => write!(f, "pin write failed"),
            Self::LimitReadFailed => write!(f, "limit switch read failed"),
            Self::CalibrationTimeout => write!(f, "limit switch not reached"),
        }
    }
}

impl From<AxisError> for Error {
    fn from(e: AxisError) -> Self {
        Self::Axis(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The thermocouple is open-circuit (sensor unplugged or broken).
    NotConnected,
    /// The bus transaction itself failed.
    Bus,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "thermocouple not connected"),
            Self::Bus => write!(f, "bus error"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Heater errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
}

impl fmt::Display for HeaterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<HeaterError> for Error {
    fn from(e: HeaterError) -> Self {
        Self::Heater(e)
    }
}

// ---------------------------------------------------------------------------
// Program errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramError {
    /// Nothing has been uploaded.
    Empty,
    /// The shared buffer lock could not be acquired in time.
    LockTimeout,
    /// The upload exceeds the configured maximum size.
    TooLarge,
    /// The buffer parsed, but yielded nothing executable.
    NoValidCommands,
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no program loaded"),
            Self::LockTimeout => write!(f, "program buffer lock timed out"),
            Self::TooLarge => write!(f, "program too large"),
            Self::NoValidCommands => write!(f, "program has no executable commands"),
        }
    }
}

impl From<ProgramError> for Error {
    fn from(e: ProgramError) -> Self {
        Self::Program(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
