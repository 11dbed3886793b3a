//! SolderBot firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation.  Hardware access goes through `embedded-hal` traits, so
//! everything here builds and runs on the host; only `main` is
//! ESP-IDF-specific.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod motion;
pub mod pins;
pub mod program;
pub mod sensors;
