//! # Servo control module
//!
//! Closed-loop control of a single axis. The motion controller consumes
//! this through the [`AxisController`] trait: a controller tracks either
//! the ordered position or the ordered velocity, produces one scalar effort
//! per tick, and reports convergence against caller-supplied thresholds.
//!
//! [`PidServo`] is the reference implementation, one PID gain set per
//! tracking mode. Its integrator and error history are reset whenever the
//! tracking mode is (re-)selected, so every new trajectory command starts
//! from a clean controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::motion_ctrl::{AxisOrder, AxisState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One set of PID gains.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,
}

/// The error terms of a controller, for monitoring.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ControlErrors {
    /// Instantaneous error
    pub error: f64,

    /// Error derivative, per second
    pub derivative: f64,

    /// Accumulated error integral, second-weighted
    pub integral: f64,
}

/// A PID servo for one axis.
pub struct PidServo {
    /// Gains used while position-tracking
    pos_gains: PidGains,

    /// Gains used while velocity-tracking
    vel_gains: PidGains,

    tracking: Tracking,

    integral: f64,
    prev_error: Option<f64>,
    last_errors: ControlErrors,
    last_effort: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What quantity the servo is currently tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tracking {
    Off,
    Position,
    Velocity,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Closed-loop controller for one axis.
pub trait AxisController: Send {
    /// Track the ordered position. Resets the controller history.
    fn set_position_tracking(&mut self);

    /// Track the ordered velocity. Resets the controller history.
    fn set_velocity_tracking(&mut self);

    /// Disable the controller: zero effort until a tracking mode is set.
    fn disable(&mut self);

    /// Evaluate one control period against the measured state, returning
    /// the control effort. A disabled controller returns zero.
    fn step(&mut self, period_s: f64, order: &AxisOrder, state: &AxisState) -> f64;

    /// True if the tracked error and its derivative are both within the
    /// given thresholds, based on the most recent `step`.
    fn converged(&self, pos_eps: f64, speed_eps: f64) -> bool;

    /// The most recent error terms.
    fn errors(&self) -> ControlErrors;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidServo {
    /// Create a disabled servo with the given position/velocity gain sets.
    pub fn new(pos_gains: PidGains, vel_gains: PidGains) -> Self {
        Self {
            pos_gains,
            vel_gains,
            tracking: Tracking::Off,
            integral: 0.0,
            prev_error: None,
            last_errors: ControlErrors::default(),
            last_effort: 0.0,
        }
    }

    fn reset_history(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_errors = ControlErrors::default();
    }
}

impl AxisController for PidServo {
    fn set_position_tracking(&mut self) {
        self.tracking = Tracking::Position;
        self.reset_history();
    }

    fn set_velocity_tracking(&mut self) {
        self.tracking = Tracking::Velocity;
        self.reset_history();
    }

    fn disable(&mut self) {
        self.tracking = Tracking::Off;
        self.last_effort = 0.0;
        self.reset_history();
    }

    fn step(&mut self, period_s: f64, order: &AxisOrder, state: &AxisState) -> f64 {
        let (error, gains) = match self.tracking {
            Tracking::Off => {
                self.last_effort = 0.0;
                return 0.0;
            }
            Tracking::Position => (order.pos - state.pos, self.pos_gains),
            Tracking::Velocity => (order.vel - state.vel, self.vel_gains),
        };

        self.integral += error * period_s;

        // No derivative on the first evaluation after a reset, a spike from
        // an arbitrary previous error helps nobody
        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / period_s,
            None => 0.0,
        };

        let effort =
            gains.k_p * error + gains.k_i * self.integral + gains.k_d * derivative;

        self.prev_error = Some(error);
        self.last_errors = ControlErrors {
            error,
            derivative,
            integral: self.integral,
        };
        self.last_effort = effort;

        effort
    }

    fn converged(&self, pos_eps: f64, speed_eps: f64) -> bool {
        self.last_errors.error.abs() < pos_eps
            && self.last_errors.derivative.abs() < speed_eps
    }

    fn errors(&self) -> ControlErrors {
        self.last_errors
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD_S: f64 = 0.01;

    fn gains(k_p: f64, k_i: f64, k_d: f64) -> PidGains {
        PidGains { k_p, k_i, k_d }
    }

    #[test]
    fn test_disabled_servo_is_silent() {
        let mut servo = PidServo::new(gains(1.0, 0.0, 0.0), gains(1.0, 0.0, 0.0));

        let order = AxisOrder {
            pos: 1.0,
            vel: 0.0,
            acc: 0.0,
        };
        let state = AxisState::default();

        assert_eq!(servo.step(PERIOD_S, &order, &state), 0.0);
    }

    #[test]
    fn test_position_tracking_effort() {
        let mut servo = PidServo::new(gains(2.0, 0.0, 0.0), gains(100.0, 0.0, 0.0));
        servo.set_position_tracking();

        let order = AxisOrder {
            pos: 1.5,
            vel: 0.0,
            acc: 0.0,
        };
        let state = AxisState {
            pos: 0.5,
            vel: 0.0,
        };

        // Pure proportional: effort = k_p * error
        assert!((servo.step(PERIOD_S, &order, &state) - 2.0).abs() < 1e-12);
        assert!((servo.errors().error - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_tracking_uses_velocity_gains() {
        let mut servo = PidServo::new(gains(2.0, 0.0, 0.0), gains(100.0, 0.0, 0.0));
        servo.set_velocity_tracking();

        let order = AxisOrder {
            pos: 0.0,
            vel: 0.2,
            acc: 0.0,
        };
        let state = AxisState {
            pos: 0.0,
            vel: 0.1,
        };

        assert!((servo.step(PERIOD_S, &order, &state) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_integral_accumulates_and_resets() {
        let mut servo = PidServo::new(gains(0.0, 1.0, 0.0), gains(0.0, 1.0, 0.0));
        servo.set_position_tracking();

        let order = AxisOrder {
            pos: 1.0,
            vel: 0.0,
            acc: 0.0,
        };
        let state = AxisState::default();

        servo.step(PERIOD_S, &order, &state);
        servo.step(PERIOD_S, &order, &state);
        assert!((servo.errors().integral - 0.02).abs() < 1e-12);

        // Re-selecting a tracking mode wipes the integrator
        servo.set_position_tracking();
        assert_eq!(servo.errors().integral, 0.0);
    }

    #[test]
    fn test_no_derivative_spike_on_first_step() {
        let mut servo = PidServo::new(gains(0.0, 0.0, 1.0), gains(0.0, 0.0, 1.0));
        servo.set_position_tracking();

        let order = AxisOrder {
            pos: 5.0,
            vel: 0.0,
            acc: 0.0,
        };
        let state = AxisState::default();

        // First step sees a large error but must report no derivative
        assert_eq!(servo.step(PERIOD_S, &order, &state), 0.0);

        // Second step with an unchanged error still has no derivative
        assert_eq!(servo.step(PERIOD_S, &order, &state), 0.0);
    }

    #[test]
    fn test_convergence_reporting() {
        let mut servo = PidServo::new(gains(1.0, 0.0, 0.0), gains(1.0, 0.0, 0.0));
        servo.set_position_tracking();

        let order = AxisOrder {
            pos: 0.005,
            vel: 0.0,
            acc: 0.0,
        };
        let state = AxisState::default();

        servo.step(PERIOD_S, &order, &state);
        servo.step(PERIOD_S, &order, &state);

        assert!(servo.converged(0.01, 0.05));
        assert!(!servo.converged(0.001, 0.05));
    }
}
