//! Forecast error metrics
//!
//! All metrics take paired `actual` / `predicted` slices. Ratio metrics that
//! cannot be formed from the data (no nonzero actuals, zero total volume, a
//! flat naive benchmark) report `f64::INFINITY` instead of failing, so a
//! report over many series can still be produced and filtered afterwards.

use crate::stats::{mean, mean_absolute_diff};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of forecast accuracy over one evaluation window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Weighted Absolute Percentage Error, in percent
    pub wape: f64,
    /// Mean of `predicted - actual`; positive means over-forecast
    pub bias: f64,
    /// Mean Absolute Scaled Error against the one-step naive forecast
    pub mase: f64,
}

impl ForecastMetrics {
    /// True when any ratio metric fell back to its infinite sentinel
    pub fn is_degenerate(&self) -> bool {
        self.mape.is_infinite() || self.wape.is_infinite() || self.mase.is_infinite()
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  WAPE:  {:.4}%", self.wape)?;
        writeln!(f, "  Bias:  {:.4}", self.bias)?;
        writeln!(f, "  MASE:  {:.4}", self.mase)?;
        Ok(())
    }
}

/// Computes [`ForecastMetrics`] from paired observations
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Create a new calculator
    pub fn new() -> Self {
        Self
    }

    /// Compute every metric for one pair of series.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::LengthMismatch`] when the slices differ in length
    /// or are empty.
    pub fn compute(&self, actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics> {
        compute_metrics(actual, predicted)
    }
}

/// Compute every metric for one pair of series
pub fn compute_metrics(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics> {
    check_pair(actual, predicted)?;

    Ok(ForecastMetrics {
        mae: mae(actual, predicted)?,
        rmse: rmse(actual, predicted)?,
        mape: mape(actual, predicted)?,
        wape: wape(actual, predicted)?,
        bias: bias(actual, predicted)?,
        mase: mase(actual, predicted)?,
    })
}

/// Mean Absolute Error
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    let abs_errors = paired(actual, predicted, |a, p| (a - p).abs())?;
    mean(&abs_errors).ok_or_else(|| MathError::EmptyInput("mae".to_string()))
}

/// Root Mean Squared Error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    let squared = paired(actual, predicted, |a, p| (a - p).powi(2))?;
    mean(&squared)
        .map(f64::sqrt)
        .ok_or_else(|| MathError::EmptyInput("rmse".to_string()))
}

/// Mean of `predicted - actual`
pub fn bias(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    let signed = paired(actual, predicted, |a, p| p - a)?;
    mean(&signed).ok_or_else(|| MathError::EmptyInput("bias".to_string()))
}

/// Mean Absolute Percentage Error in percent, over entries with a nonzero actual.
///
/// Returns `f64::INFINITY` when every actual is zero.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let ratios: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &p)| ((a - p) / a).abs())
        .collect();

    Ok(mean(&ratios).map_or(f64::INFINITY, |m| m * 100.0))
}

/// Weighted Absolute Percentage Error in percent.
///
/// Returns `f64::INFINITY` when the actuals sum to zero.
pub fn wape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let volume: f64 = actual.iter().sum();
    if volume == 0.0 {
        return Ok(f64::INFINITY);
    }
    let abs_error: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(abs_error / volume * 100.0)
}

/// Mean Absolute Scaled Error against the one-step naive forecast.
///
/// Returns `f64::INFINITY` with fewer than two actuals or a flat naive benchmark.
pub fn mase(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    let mae = mae(actual, predicted)?;
    Ok(match mean_absolute_diff(actual) {
        Some(naive) if naive != 0.0 => mae / naive,
        _ => f64::INFINITY,
    })
}

fn check_pair(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(MathError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    Ok(())
}

fn paired<F>(actual: &[f64], predicted: &[f64], f: F) -> Result<Vec<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    check_pair(actual, predicted)?;
    Ok(actual.iter().zip(predicted).map(|(&a, &p)| f(a, p)).collect())
}
