//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the station's outer surface: the inbound commands,
//! the outbound events and the [`service::Station`] that ties the
//! lifecycle controller to the machine.  All interaction with hardware
//! happens through the **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
