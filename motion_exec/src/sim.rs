//! # Simulated differential-drive plant
//!
//! A deterministic stand-in for the real drive electronics and encoders,
//! used by the demo executive and the closed-loop tests. A wheel command is
//! interpreted directly as an encoder tick rate, so the plant follows
//! commands perfectly while still quantising feedback to whole ticks, with
//! the fractional remainder carried between periods.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::motion_ctrl::WheelCommands;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The simulated plant state.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiffDrivePlant {
    left_carry: f64,
    right_carry: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DiffDrivePlant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the plant for one period under the given wheel commands,
    /// returning the encoder increments observed over that period.
    pub fn step(&mut self, period_s: f64, cmds: &WheelCommands) -> (i32, i32) {
        self.left_carry += cmds.left as f64 * period_s;
        self.right_carry += cmds.right as f64 * period_s;

        let left_ticks = self.left_carry.trunc() as i32;
        let right_ticks = self.right_carry.trunc() as i32;

        self.left_carry -= left_ticks as f64;
        self.right_carry -= right_ticks as f64;

        (left_ticks, right_ticks)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
