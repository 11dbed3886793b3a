//! Temperature sensing for the soldering tip.

pub mod thermocouple;
