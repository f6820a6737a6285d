//! Descriptive statistics shared by the metric and reconciliation code

use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Population variance (divides by `n`), `None` for an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.len() == 1 {
        return Some(0.0);
    }
    Some(values.iter().population_variance())
}

/// Mean absolute one-step difference `mean(|x[t] - x[t-1]|)`.
///
/// This is the in-sample error of the naive "repeat the last value" forecast
/// and is the scale used by MASE. Returns `None` with fewer than two values.
pub fn mean_absolute_diff(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    mean(&diffs)
}

/// Scale shares so they sum to one.
///
/// A group whose total is zero or not finite cannot be scaled and is split
/// equally instead.
pub fn normalize_shares(shares: &[f64]) -> Vec<f64> {
    if shares.is_empty() {
        return Vec::new();
    }
    let total: f64 = shares.iter().sum();
    if total == 0.0 || !total.is_finite() {
        let equal = 1.0 / shares.len() as f64;
        return vec![equal; shares.len()];
    }
    shares.iter().map(|s| s / total).collect()
}
