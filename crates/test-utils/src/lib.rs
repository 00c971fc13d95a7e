//! Shared test utilities for the geoimage workspace.
//!
//! Band generators, grid and WKT fixtures, temporary output locations and
//! a couple of float assertions that the geoimage crates share.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Fails when `|left - right| > epsilon`. Operands are widened to f64.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: {:?} and {:?} differ by {:?} (epsilon {:?})",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Bitwise equality of two float slices, so NaN matches NaN.
#[macro_export]
macro_rules! assert_bits_eq {
    ($left:expr, $right:expr) => {{
        let left: &[f64] = &$left;
        let right: &[f64] = &$right;
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            if l.to_bits() != r.to_bits() {
                panic!("assertion failed: value {} differs: {:?} != {:?}", i, l, r);
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_bits_eq_matches_nan() {
        assert_bits_eq!([1.0, f64::NAN], [1.0, f64::NAN]);
    }

    #[test]
    #[should_panic(expected = "differs")]
    fn test_assert_bits_eq_fails() {
        assert_bits_eq!([1.0, 2.0], [1.0, 3.0]);
    }
}
