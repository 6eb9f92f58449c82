//! Axis mode state machine
//!
//! Each axis is always in exactly one of five modes. Autonomous transitions
//! happen only inside the cyclic step and are expressed here as pure
//! functions of the axis's own event and its partner's mode, so the
//! cross-axis coupling rules can be tested exhaustively without running the
//! tick loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode of one axis of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AxisMode {
    /// Servo disabled, no effort produced.
    Off,

    /// Servo holds a fixed target indefinitely, no ramp.
    Fixed,

    /// No ramp; the servo is converging on a final target and the axis will
    /// switch to `Off` once within the convergence thresholds.
    Ending,

    /// The ramp advances the order toward a final position+velocity target,
    /// with the servo position-tracking the ramp output.
    RampPosition,

    /// The ramp advances the ordered velocity toward a final velocity
    /// target, with the servo velocity-tracking the ramp output. Runs until
    /// a new command replaces it.
    RampSpeed,
}

impl Default for AxisMode {
    fn default() -> Self {
        AxisMode::Off
    }
}

impl AxisMode {
    /// True if the axis is still actively ramping toward a target.
    pub fn is_ramping(&self) -> bool {
        matches!(self, AxisMode::RampPosition | AxisMode::RampSpeed)
    }
}

// ---------------------------------------------------------------------------
// TRANSITION FUNCTIONS
// ---------------------------------------------------------------------------

/// Transition applied to a `RampPosition` axis whose ramp has just reported
/// target-reached.
///
/// Returns the new `(own, partner)` mode pair:
/// - if the partner is still ramping, this axis holds position (`Fixed`) and
///   lets the partner finish,
/// - otherwise this axis starts converging (`Ending`); a `Fixed` partner is
///   dragged along so that both stop together.
pub(crate) fn after_ramp_reached(partner: AxisMode) -> (AxisMode, AxisMode) {
    match partner {
        AxisMode::RampPosition | AxisMode::RampSpeed => (AxisMode::Fixed, partner),
        AxisMode::Fixed => (AxisMode::Ending, AxisMode::Ending),
        AxisMode::Off | AxisMode::Ending => (AxisMode::Ending, partner),
    }
}

/// Transition applied to an `Ending` axis whose servo has just reported
/// convergence.
///
/// Returns the new `(own, partner)` mode pair and whether the joint
/// trajectory is now complete:
/// - the converged axis always powers off,
/// - a `Fixed` partner is promoted to `Ending` so it converges too,
/// - if the partner is already `Off` the whole trajectory is done.
pub(crate) fn after_converged(partner: AxisMode) -> (AxisMode, AxisMode, bool) {
    match partner {
        AxisMode::Fixed => (AxisMode::Off, AxisMode::Ending, false),
        AxisMode::Off => (AxisMode::Off, AxisMode::Off, true),
        other => (AxisMode::Off, other, false),
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Edge detector over the pair of axis modes.
///
/// Mode-change telemetry is edge-triggered: it must fire on the first tick
/// in which either mode differs from the previous tick, and stay silent
/// otherwise.
#[derive(Default)]
pub struct ModeEdge {
    last: Option<(AxisMode, AxisMode)>,
}

impl ModeEdge {
    /// Feed the current mode pair, returning true if it differs from the
    /// pair seen on the previous call (always true on the first call).
    pub fn changed(&mut self, delta: AxisMode, alpha: AxisMode) -> bool {
        let changed = self.last != Some((delta, alpha));
        self.last = Some((delta, alpha));
        changed
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
