//! Actuator drivers: stepper channels, the heater output, and in-memory
//! stand-ins for host runs.

pub mod heater;
pub mod sim;
pub mod stepper;
