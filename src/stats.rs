//! Small numeric helpers shared by the calculators.
//!
//! Report values are rounded half-to-even at a fixed number of decimal places,
//! which is what downstream readers of the report expect.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use statrs::statistics::Statistics;

/// Round to `dp` decimal places using banker's rounding.
///
/// The float's exact binary value is rounded, so `2.675` (stored just below
/// the midpoint) becomes `2.67`. Non-finite values are returned untouched.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Round to the nearest integer (half-to-even), as a whole-number load value.
pub fn round_whole(value: f64) -> i64 {
    round_dp(value, 0) as i64
}

/// Render a float for report text, keeping a trailing `.0` on whole numbers.
pub fn fmt_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

/// Sample standard deviation (n - 1), `None` below two points.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else {
        Some(values.iter().std_dev())
    }
}

/// Safe ratio: `None` when the denominator is zero or either side is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        None
    } else {
        Some(numerator / denominator)
    }
}
