//! Kinematic wheel-command combiner
//!
//! Maps the two per-axis control efforts to left/right wheel commands for
//! the differential drive. Evaluated every tick regardless of mode: an off
//! axis contributes a zero effort.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The combiner's fixed geometry.
#[derive(Clone, Copy, Debug)]
pub struct WheelCombiner {
    /// Half the effective wheel track, in control-effort units.
    track_gain: f64,
}

/// A pair of wheel commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WheelCommands {
    pub left: i32,
    pub right: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelCombiner {
    /// Create a combiner with the given geometric gain.
    pub fn new(track_gain: f64) -> Self {
        Self { track_gain }
    }

    /// Combine the translation and rotation efforts into wheel commands.
    ///
    /// `left = delta - k*alpha`, `right = delta + k*alpha`, so the wheel
    /// difference is always `2*k*alpha`.
    pub fn combine(&self, delta_effort: f64, alpha_effort: f64) -> WheelCommands {
        WheelCommands {
            left: (delta_effort - self.track_gain * alpha_effort) as i32,
            right: (delta_effort + self.track_gain * alpha_effort) as i32,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
