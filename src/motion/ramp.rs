//! Open-loop trapezoidal step timing.
//!
//! The delay between pulses starts at `start_delay_us`, shrinks by
//! `accel_us_per_step` for every step away from either end of the run, and
//! never drops below `min_delay_us`.  The profile is symmetric: the last
//! step of a run is as slow as the first.
//!
//! ```text
//!  delay
//!   ▲
//!   │\                      /
//!   │ \                    /
//!   │  \________________  /     ← min_delay_us floor
//!   └──────────────────────────▶ step index
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampProfile {
    /// Delay for the first and last step of a run (µs).
    pub start_delay_us: u32,
    /// Cruise floor (µs).
    pub min_delay_us: u32,
    /// Delay reduction per step from either end (µs).
    pub accel_us_per_step: u32,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            start_delay_us: 800,
            min_delay_us: 150,
            accel_us_per_step: 10,
        }
    }
}

impl RampProfile {
    /// Pulse period for step `index` of a run of `total` steps.
    pub fn delay_for_step(&self, index: u32, total: u32) -> u32 {
        let from_end = total.saturating_sub(1).saturating_sub(index);
        let edge = index.min(from_end);
        self.start_delay_us
            .saturating_sub(edge.saturating_mul(self.accel_us_per_step))
            .max(self.min_delay_us)
    }
}
