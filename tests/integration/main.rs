//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises the station against
//! mock adapters.  All tests run on the host with no real hardware.

mod lifecycle_flow_tests;
mod mock_hw;
mod station_tests;
