//! # Odometry module
//!
//! Converts raw encoder increments into axis-space displacement increments
//! and maintains the robot's absolute pose. The motion controller consumes
//! this through the [`Odometry`] trait; [`WheelOdometry`] is the reference
//! implementation for a two-encoder differential drive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::wrap_angle_signed;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of axis-space displacement increments and absolute pose.
pub trait Odometry: Send {
    /// Integrate one tick's worth of encoder increments.
    ///
    /// Returns the incremental `(delta_m, alpha_rad)` displacement pair:
    /// linear advance along the heading and rotation about the centre.
    fn step(&mut self, left_ticks: i32, right_ticks: i32) -> (f64, f64);

    /// Absolute X position, meters.
    fn x_m(&self) -> f64;

    /// Absolute Y position, meters.
    fn y_m(&self) -> f64;

    /// Absolute heading, radians in (-pi, pi].
    fn heading_rad(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dead-reckoning odometry over two wheel encoders.
#[derive(Clone, Copy, Debug, Default)]
pub struct WheelOdometry {
    /// Encoder ticks per meter of wheel travel
    ticks_per_m: f64,

    /// Wheel separation, meters
    wheel_sep_m: f64,

    x_m: f64,
    y_m: f64,
    heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelOdometry {
    /// Create odometry at the origin pose with the given encoder geometry.
    pub fn new(ticks_per_m: f64, wheel_sep_m: f64) -> Self {
        Self {
            ticks_per_m,
            wheel_sep_m,
            x_m: 0.0,
            y_m: 0.0,
            heading_rad: 0.0,
        }
    }
}

impl Odometry for WheelOdometry {
    fn step(&mut self, left_ticks: i32, right_ticks: i32) -> (f64, f64) {
        let left_m = left_ticks as f64 / self.ticks_per_m;
        let right_m = right_ticks as f64 / self.ticks_per_m;

        let delta_m = 0.5 * (left_m + right_m);
        let alpha_rad = (right_m - left_m) / self.wheel_sep_m;

        // Integrate the pose along the chord at the mid-increment heading
        let mid_heading = self.heading_rad + 0.5 * alpha_rad;
        self.x_m += delta_m * mid_heading.cos();
        self.y_m += delta_m * mid_heading.sin();
        self.heading_rad = wrap_angle_signed(self.heading_rad + alpha_rad);

        (delta_m, alpha_rad)
    }

    fn x_m(&self) -> f64 {
        self.x_m
    }

    fn y_m(&self) -> f64 {
        self.y_m
    }

    fn heading_rad(&self) -> f64 {
        self.heading_rad
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_straight_line() {
        let mut odom = WheelOdometry::new(1000.0, 0.4);

        let mut total_delta = 0.0;
        for _ in 0..100 {
            let (delta_m, alpha_rad) = odom.step(10, 10);
            assert_eq!(alpha_rad, 0.0);
            total_delta += delta_m;
        }

        assert!((total_delta - 1.0).abs() < 1e-9);
        assert!((odom.x_m() - 1.0).abs() < 1e-9);
        assert!(odom.y_m().abs() < 1e-9);
        assert!(odom.heading_rad().abs() < 1e-9);
    }

    #[test]
    fn test_point_turn() {
        let mut odom = WheelOdometry::new(1000.0, 0.4);

        // Opposed wheels: no translation, pure rotation
        let mut total_alpha = 0.0;
        for _ in 0..100 {
            let (delta_m, alpha_rad) = odom.step(-2, 2);
            assert_eq!(delta_m, 0.0);
            total_alpha += alpha_rad;
        }

        assert!((total_alpha - 1.0).abs() < 1e-9);
        assert!((odom.heading_rad() - 1.0).abs() < 1e-9);
        assert!(odom.x_m().abs() < 1e-9);
        assert!(odom.y_m().abs() < 1e-9);
    }

    #[test]
    fn test_heading_wraps() {
        let mut odom = WheelOdometry::new(1000.0, 0.4);

        // Keep turning well past a full revolution
        for _ in 0..2000 {
            odom.step(-2, 2);
        }

        let h = odom.heading_rad();
        assert!(h > -PI - 1e-9 && h <= PI + 1e-9);
    }

    #[test]
    fn test_arc_quarter_turn() {
        let mut odom = WheelOdometry::new(1000.0, 0.4);

        // 8/12 ticks per step is a 1 m radius arc advancing 0.01 rad per
        // step; integrate most of a quarter turn in small increments and
        // compare against the analytic circle
        let steps = 157;
        for _ in 0..steps {
            odom.step(8, 12);
        }

        let arc_rad = steps as f64 * 0.01;
        assert!((odom.heading_rad() - arc_rad).abs() < 1e-9);
        assert!((odom.x_m() - arc_rad.sin()).abs() < 1e-3);
        assert!((odom.y_m() - (1.0 - arc_rad.cos())).abs() < 1e-3);
    }
}
