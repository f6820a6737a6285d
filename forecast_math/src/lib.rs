//! # Forecast Math
//!
//! Numeric building blocks for forecast evaluation.
//! This crate provides the standard forecast-error statistics (MAE, RMSE,
//! MAPE, WAPE, bias, MASE) and a small set of one-step baseline forecasters
//! that can be replayed by a rolling-window backtest.

use thiserror::Error;

pub mod forecasting;
pub mod metrics;
pub mod stats;

pub use forecasting::{BoxError, LinearTrend, Naive, StepForecaster, WindowMean};
pub use metrics::{ForecastMetrics, MetricsCalculator};

/// Errors that can occur in forecast metric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Length mismatch: {actual} actual values vs {predicted} predicted values")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for forecast math operations
pub type Result<T> = std::result::Result<T, MathError>;
