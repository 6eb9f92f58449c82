//! Per-axis data structures shared between the orchestrator, the ramp
//! generator and the servo controllers.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Measured state of one axis, integrated from odometry each tick.
///
/// The cyclic step is the sole writer of this structure, commands only
/// re-initialise it at issue time (which happens in the cyclic context, see
/// the module docs).
#[derive(Clone, Copy, Default, Debug, Serialize)]
pub struct AxisState {
    /// Accumulated position since the current command was issued.
    ///
    /// Units: meters (delta) or radians (alpha)
    pub pos: f64,

    /// Velocity derived from the last odometry increment.
    ///
    /// Units: meters/second (delta) or radians/second (alpha)
    pub vel: f64,
}

/// The instantaneous commanded trajectory point for one axis.
///
/// Advanced each tick by the ramp generator when the axis mode requires
/// ramping; set once at command-issue time and held fixed otherwise.
#[derive(Clone, Copy, Default, Debug, Serialize)]
pub struct AxisOrder {
    /// Ordered position
    pub pos: f64,

    /// Ordered velocity
    pub vel: f64,

    /// Ordered acceleration
    pub acc: f64,
}

/// The trajectory's end target for one axis.
///
/// Written once when a command is issued, read by the ramp generator every
/// tick until the target is reached.
#[derive(Clone, Copy, Default, Debug, Serialize)]
pub struct AxisFinalOrder {
    /// Target position
    pub pos: f64,

    /// Target velocity
    pub vel: f64,
}

/// Active kinematic limits for one axis.
///
/// Resolved from command overrides and persistent defaults at command-issue
/// time, never sentinel-checked afterwards.
#[derive(Clone, Copy, Default, Debug, Serialize)]
pub struct AxisLimits {
    /// Maximum speed magnitude
    pub v_max: f64,

    /// Maximum acceleration magnitude
    pub a_max: f64,

    /// Maximum deceleration magnitude
    pub d_max: f64,
}
