//! # Ramp generation module
//!
//! Advances an axis order one control period at a time toward a final
//! target, bounding velocity and acceleration. The motion controller
//! consumes this through the [`RampGenerator`] trait; [`TrapezoidRamp`] is
//! the reference implementation with the classic accelerate / cruise /
//! brake profile.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::motion_ctrl::{AxisFinalOrder, AxisOrder};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Generator of per-tick trajectory orders.
pub trait RampGenerator: Send {
    /// Advance the order one period toward the final position+velocity
    /// target, bounding speed by `v_max` and acceleration by `a_max`.
    ///
    /// Returns true once the target has been reached, at which point the
    /// order has been snapped exactly onto the final target.
    fn advance_position(
        &self,
        period_s: f64,
        order: &mut AxisOrder,
        final_order: &AxisFinalOrder,
        v_max: f64,
        a_max: f64,
    ) -> bool;

    /// Advance the ordered velocity one period toward the target velocity.
    ///
    /// Speeding up is bounded by `a_max`, slowing down by `d_max`, and the
    /// target itself is clamped to `v_max` in magnitude. The ordered
    /// position integrates the ordered velocity. Runs indefinitely, there
    /// is no terminal condition.
    fn advance_velocity(
        &self,
        period_s: f64,
        order: &mut AxisOrder,
        target_vel: f64,
        a_max: f64,
        v_max: f64,
        d_max: f64,
    );
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trapezoidal profile ramp generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrapezoidRamp;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampGenerator for TrapezoidRamp {
    fn advance_position(
        &self,
        period_s: f64,
        order: &mut AxisOrder,
        final_order: &AxisFinalOrder,
        v_max: f64,
        a_max: f64,
    ) -> bool {
        let dist = final_order.pos - order.pos;
        let vel_err = final_order.vel - order.vel;

        // Snap onto the target once within one integration step of it
        if dist.abs() <= order.vel.abs() * period_s + a_max * period_s * period_s
            && vel_err.abs() <= 2.0 * a_max * period_s
        {
            order.pos = final_order.pos;
            order.vel = final_order.vel;
            order.acc = 0.0;
            return true;
        }

        let dir = dist.signum();

        // Distance needed to change from the current to the final speed at
        // the acceleration bound
        let brake_dist = (order.vel * order.vel - final_order.vel * final_order.vel)
            / (2.0 * a_max);

        // Brake if moving toward the target and inside the braking distance,
        // otherwise accelerate toward it (which also brakes an axis moving
        // the wrong way)
        let acc = if order.vel * dir > 0.0 && brake_dist.abs() >= dist.abs() {
            -dir * a_max
        } else {
            dir * a_max
        };

        let new_vel = clamp(order.vel + acc * period_s, -v_max, v_max);
        order.acc = (new_vel - order.vel) / period_s;
        order.vel = new_vel;
        order.pos += order.vel * period_s;

        false
    }

    fn advance_velocity(
        &self,
        period_s: f64,
        order: &mut AxisOrder,
        target_vel: f64,
        a_max: f64,
        v_max: f64,
        d_max: f64,
    ) {
        let target = clamp(target_vel, -v_max, v_max);
        let vel_err = target - order.vel;

        // Reducing the speed magnitude (or reversing) uses the deceleration
        // bound, increasing it uses the acceleration bound
        let slowing = target.abs() < order.vel.abs() || target * order.vel < 0.0;
        let bound = if slowing { d_max } else { a_max };

        let step = clamp(vel_err, -bound * period_s, bound * period_s);
        order.acc = step / period_s;
        order.vel += step;
        order.pos += order.vel * period_s;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
