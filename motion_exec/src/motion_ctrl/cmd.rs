//! Commands passed into MotionCtrl
//!
//! Speed/acceleration bounds are expressed as `Option<f64>` overrides. A
//! `None` means "use the persistent default from the parameters"; overrides
//! are resolved when the command is applied and never re-checked afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::mpsc::{SyncSender, TrySendError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A trajectory request for the motion controller.
///
/// Exactly one request is pending per axis at any time; issuing a new
/// command unconditionally overwrites the previous one.
#[derive(Clone, Copy, Debug)]
pub enum MotionCommand {
    /// Advance by a distance along the current heading, ramped. The rotation
    /// axis holds zero.
    Translate {
        /// Signed distance to cover, meters
        dist_m: f64,
        /// Speed bound override, meters/second
        speed_ms: Option<f64>,
        /// Acceleration bound override, meters/second^2
        acc_mss: Option<f64>,
    },

    /// Advance by a distance with no ramp: the order is preset directly to
    /// the target and the servo converges on it. Useful when the caller
    /// supplies an already-smoothed target.
    TranslateFree {
        /// Signed distance to cover, meters
        dist_m: f64,
    },

    /// Rotate by an angle, ramped. The translation axis holds zero.
    Rotate {
        /// Signed rotation to cover, radians
        rot_rad: f64,
        /// Rate bound override, radians/second
        rate_rads: Option<f64>,
        /// Acceleration bound override, radians/second^2
        acc_radss: Option<f64>,
    },

    /// Rotate by an angle with no ramp.
    RotateFree {
        /// Signed rotation to cover, radians
        rot_rad: f64,
    },

    /// Translate and rotate simultaneously, both axes ramped with
    /// independent bounds.
    TranslateRotate {
        dist_m: f64,
        rot_rad: f64,
        speed_ms: Option<f64>,
        acc_mss: Option<f64>,
        rate_rads: Option<f64>,
        acc_radss: Option<f64>,
    },

    /// Hold a signed linear speed indefinitely, ramped. The rotation axis
    /// holds zero.
    HoldSpeed {
        /// Signed target speed, meters/second. Its magnitude also bounds
        /// the ramp.
        speed_ms: f64,
        /// Acceleration bound override, meters/second^2
        acc_mss: Option<f64>,
        /// Deceleration bound override, meters/second^2
        dec_mss: Option<f64>,
    },

    /// Hold a signed linear speed with no ramp: the ordered velocity is set
    /// directly.
    HoldSpeedFree { speed_ms: f64 },

    /// Hold a signed angular rate indefinitely, ramped. The translation axis
    /// holds zero.
    HoldRate {
        /// Signed target rate, radians/second. Its magnitude also bounds
        /// the ramp.
        rate_rads: f64,
        /// Acceleration bound override, radians/second^2
        acc_radss: Option<f64>,
        /// Deceleration bound override, radians/second^2
        dec_radss: Option<f64>,
    },

    /// Hold a signed angular rate with no ramp.
    HoldRateFree { rate_rads: f64 },

    /// Hold linear speed and angular rate simultaneously, both ramped.
    HoldSpeedRate {
        speed_ms: f64,
        rate_rads: f64,
        acc_mss: Option<f64>,
        dec_mss: Option<f64>,
        acc_radss: Option<f64>,
        dec_radss: Option<f64>,
    },

    /// Power both axes off immediately and fire the completion callback
    /// unconditionally.
    Stop,

    /// Actively hold the current position on both axes (powered hold, not
    /// off).
    HoldInPlace,

    /// Reach an absolute X coordinate by driving along the current heading.
    /// Rejected near a singular heading (see `MotionCtrlError`).
    ReachX {
        x_m: f64,
        speed_ms: Option<f64>,
        acc_mss: Option<f64>,
    },

    /// Reach an absolute Y coordinate by driving along the current heading.
    ReachY {
        y_m: f64,
        speed_ms: Option<f64>,
        acc_mss: Option<f64>,
    },

    /// Rotate to an absolute heading by the shortest signed angle.
    ReachHeading {
        heading_rad: f64,
        rate_rads: Option<f64>,
        acc_radss: Option<f64>,
    },

    /// Update the convergence thresholds read by the `Ending` checks.
    SetEpsilons {
        eps_dist_m: f64,
        eps_speed_ms: f64,
        eps_theta_rad: f64,
        eps_omega_rads: f64,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cloneable handle used to issue commands to the controller from another
/// execution context.
///
/// Commands are queued and applied by the cyclic step at the top of its next
/// tick, so a multi-field update can never be torn by a concurrent tick.
#[derive(Clone)]
pub struct MotionCommander {
    pub(crate) sender: SyncSender<MotionCommand>,
}

/// Errors which can occur when sending a command to the controller.
#[derive(Debug, thiserror::Error)]
pub enum CommandSendError {
    #[error("The command queue is full")]
    QueueFull,

    #[error("The controller has been dropped")]
    ControllerGone,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCommander {
    /// Queue a command for the controller's next tick.
    ///
    /// This call never blocks. If the bounded queue is full the command is
    /// rejected, the caller may retry on its own schedule.
    pub fn send(&self, cmd: MotionCommand) -> Result<(), CommandSendError> {
        match self.sender.try_send(cmd) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(CommandSendError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(CommandSendError::ControllerGone),
        }
    }
}
