//! Stateless analytic primitives used by the metrics calculator.
//!
//! These are pure functions that only operate on numbers or slices of
//! numbers and can be composed with windowing strategies.

/// Arithmetic mean of the window. Returns `f64::NAN` for an empty window.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Open-to-close change in percent, rounded to two decimals.
///
/// Returns `0.0` when `open` is zero or either price is not finite.
pub fn percent_change(open: f64, close: f64) -> f64 {
    if open == 0.0 || !open.is_finite() || !close.is_finite() {
        return 0.0;
    }
    round_to((close - open) / open * 100.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_nan() {
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn mean_averages_values() {
        assert_eq!(mean(&[100.0, 110.0, 90.0]), 100.0);
        assert_eq!(mean(&[100.0, 110.0]), 105.0);
    }

    #[test]
    fn round_to_two_places() {
        assert_eq!(round_to(-5.263157894736842, 2), -5.26);
        assert_eq!(round_to(10.0, 2), 10.0);
        assert_eq!(round_to(1.005_1, 2), 1.01);
    }

    #[test]
    fn percent_change_matches_open_to_close() {
        assert_eq!(percent_change(95.0, 90.0), -5.26);
        assert_eq!(percent_change(100.0, 110.0), 10.0);
    }

    #[test]
    fn percent_change_guards_zero_and_non_finite() {
        assert_eq!(percent_change(0.0, 90.0), 0.0);
        assert_eq!(percent_change(f64::NAN, 90.0), 0.0);
        assert_eq!(percent_change(100.0, f64::NAN), 0.0);
    }
}
