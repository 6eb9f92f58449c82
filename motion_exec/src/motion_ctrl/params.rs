//! Parameters structure for MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::servo_ctrl::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Motion control.
#[derive(Clone, Debug, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Number of encoder ticks per meter of wheel travel.
    ///
    /// Units: ticks/meter
    pub ticks_per_m: f64,

    /// Separation between the two wheels.
    ///
    /// Units: meters
    pub wheel_sep_m: f64,

    /// Geometric gain of the wheel-command combiner: half the effective
    /// wheel track expressed in control-effort units. The rotation effort is
    /// scaled by this before being differenced across the two wheels.
    pub wheel_track_gain: f64,

    // ---- KINEMATIC DEFAULTS ----
    /// Default translation speed bound.
    ///
    /// Units: meters/second
    pub default_speed_ms: f64,

    /// Default translation acceleration bound.
    ///
    /// Units: meters/second^2
    pub default_acc_mss: f64,

    /// Default translation deceleration bound.
    ///
    /// Units: meters/second^2
    pub default_dec_mss: f64,

    /// Default rotation rate bound.
    ///
    /// Units: radians/second
    pub default_rate_rads: f64,

    /// Default rotation acceleration bound.
    ///
    /// Units: radians/second^2
    pub default_rot_acc_radss: f64,

    /// Default rotation deceleration bound.
    ///
    /// Units: radians/second^2
    pub default_rot_dec_radss: f64,

    // ---- SERVO GAINS ----
    /// Position-tracking gains for the translation axis.
    pub delta_pos_gains: PidGains,

    /// Velocity-tracking gains for the translation axis.
    pub delta_speed_gains: PidGains,

    /// Position-tracking gains for the rotation axis.
    pub alpha_pos_gains: PidGains,

    /// Velocity-tracking gains for the rotation axis.
    pub alpha_speed_gains: PidGains,

    // ---- CONVERGENCE THRESHOLDS ----
    /// Translation position epsilon.
    ///
    /// Units: meters
    pub eps_dist_m: f64,

    /// Translation speed epsilon.
    ///
    /// Units: meters/second
    pub eps_speed_ms: f64,

    /// Rotation position epsilon.
    ///
    /// Units: radians
    pub eps_theta_rad: f64,

    /// Rotation rate epsilon.
    ///
    /// Units: radians/second
    pub eps_omega_rads: f64,

    // ---- GUARDS ----
    /// Minimum magnitude of the trigonometric divisor (cos or sin of the
    /// heading) accepted by the reach-absolute-coordinate commands. Below
    /// this the command is rejected as singular.
    pub min_reach_divisor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Defaults tuned for the simulated plant, which maps a wheel command
    /// directly to an encoder tick rate.
    fn default() -> Self {
        Params {
            ticks_per_m: 1000.0,
            wheel_sep_m: 0.4,
            wheel_track_gain: 2.0,

            default_speed_ms: 0.5,
            default_acc_mss: 0.5,
            default_dec_mss: 0.5,
            default_rate_rads: 1.5,
            default_rot_acc_radss: 3.0,
            default_rot_dec_radss: 3.0,

            delta_pos_gains: PidGains {
                k_p: 50_000.0,
                k_i: 0.0,
                k_d: 500.0,
            },
            delta_speed_gains: PidGains {
                k_p: 600.0,
                k_i: 2_000.0,
                k_d: 0.0,
            },
            alpha_pos_gains: PidGains {
                k_p: 5_000.0,
                k_i: 0.0,
                k_d: 50.0,
            },
            alpha_speed_gains: PidGains {
                k_p: 60.0,
                k_i: 200.0,
                k_d: 0.0,
            },

            eps_dist_m: 0.01,
            eps_speed_ms: 0.05,
            eps_theta_rad: 0.01,
            eps_omega_rads: 0.05,

            min_reach_divisor: 0.05,
        }
    }
}
