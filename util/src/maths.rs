//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value between a minimum and maximum.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Wrap an angle in radians into the half-open range (-pi, pi].
///
/// The upper bound is inclusive so that a half turn is always represented as
/// `+pi`, never `-pi`.
pub fn wrap_angle_signed(angle_rad: f64) -> f64 {
    let wrapped = rem_euclid(angle_rad, std::f64::consts::TAU);

    if wrapped > std::f64::consts::PI {
        wrapped - std::f64::consts::TAU
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::from(0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(2f64, 0f64, 1f64), 1f64);
        assert_eq!(clamp(-2f64, 0f64, 1f64), 0f64);
        assert_eq!(clamp(0.5f64, 0f64, 1f64), 0.5f64);
    }

    #[test]
    fn test_wrap_angle_signed() {
        assert!((wrap_angle_signed(0.0) - 0.0).abs() < 1e-12);
        assert!((wrap_angle_signed(PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle_signed(-PI / 2.0) + PI / 2.0).abs() < 1e-12);

        // A half turn is +pi whichever way round it is requested
        assert!((wrap_angle_signed(PI) - PI).abs() < 1e-12);
        assert!((wrap_angle_signed(-PI) - PI).abs() < 1e-12);

        // Wrapping of full turns
        assert!((wrap_angle_signed(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_angle_signed(-TAU - 1.0) + 1.0).abs() < 1e-12);
        assert!((wrap_angle_signed(3.0 * PI) - PI).abs() < 1e-12);

        // Result always lies in (-pi, pi]
        let mut a = -20.0;
        while a < 20.0 {
            let w = wrap_angle_signed(a);
            assert!(w > -PI - 1e-12 && w <= PI + 1e-12);
            a += 0.37;
        }
    }
}
