//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to              |
//! |------------|------------|--------------------------|
//! | `console`  | (inbound)  | Operator serial console  |
//! | `log_sink` | EventSink  | Serial log output        |
//! | `time`     | Clock      | ESP32 high-res timer     |
//!
//! The axis, heater and temperature ports are implemented by
//! [`drivers`](crate::drivers) and [`sensors`](crate::sensors).

pub mod console;
pub mod log_sink;
pub mod time;
