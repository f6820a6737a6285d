//! One-step forecasters for walk-forward evaluation
//!
//! Contains the [`StepForecaster`] seam used by rolling-window backtests and
//! a few baseline implementations:
//! - Naive (repeat the last observation)
//! - Window Mean (mean of the most recent observations)
//! - Linear Trend (least-squares line extrapolated one step)

use crate::{MathError, Result};

/// Boxed error returned by caller-supplied forecasters
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Produces a single next-step prediction from a training window.
///
/// The window holds only observations strictly before the point being
/// predicted. Closures of the form `FnMut(&[f64]) -> Result<f64, E>`
/// implement this trait, so model-fitting code can be passed in directly.
pub trait StepForecaster {
    /// Predict the value that follows `window`
    fn forecast_step(&mut self, window: &[f64]) -> std::result::Result<f64, BoxError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F, E> StepForecaster for F
where
    F: FnMut(&[f64]) -> std::result::Result<f64, E>,
    E: Into<BoxError>,
{
    fn forecast_step(&mut self, window: &[f64]) -> std::result::Result<f64, BoxError> {
        self(window).map_err(Into::into)
    }
}

/// Repeats the last observed value
#[derive(Debug, Clone, Copy, Default)]
pub struct Naive;

impl Naive {
    /// Create a new naive forecaster
    pub fn new() -> Self {
        Self
    }
}

impl StepForecaster for Naive {
    fn forecast_step(&mut self, window: &[f64]) -> std::result::Result<f64, BoxError> {
        window.last().copied().ok_or_else(|| {
            MathError::InsufficientData("Naive forecast needs at least 1 point".to_string())
                .into()
        })
    }

    fn name(&self) -> &str {
        "naive"
    }
}

/// Mean of the most recent `period` observations
#[derive(Debug, Clone, Copy)]
pub struct WindowMean {
    period: usize,
}

impl WindowMean {
    /// Create a new window mean over `period` observations
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be positive".to_string(),
            ));
        }
        Ok(Self { period })
    }

    /// Number of trailing observations averaged
    pub fn period(&self) -> usize {
        self.period
    }
}

impl StepForecaster for WindowMean {
    fn forecast_step(&mut self, window: &[f64]) -> std::result::Result<f64, BoxError> {
        if window.is_empty() {
            return Err(MathError::InsufficientData(
                "Window mean needs at least 1 point".to_string(),
            )
            .into());
        }
        // Shorter windows average what is available
        let tail = &window[window.len().saturating_sub(self.period)..];
        Ok(tail.iter().sum::<f64>() / tail.len() as f64)
    }

    fn name(&self) -> &str {
        "window_mean"
    }
}

/// Least-squares trend line extrapolated one step past the window
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

impl LinearTrend {
    /// Create a new linear trend forecaster
    pub fn new() -> Self {
        Self
    }

    /// Fit `y = slope * x + intercept` with `x = 0..n`
    pub fn fit(values: &[f64]) -> Result<(f64, f64)> {
        if values.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data for a trend. Need at least 2 points.".to_string(),
            ));
        }

        let n = values.len() as f64;
        let x_mean = (values.len() - 1) as f64 / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        let slope = numerator / denominator;
        Ok((slope, y_mean - slope * x_mean))
    }
}

impl StepForecaster for LinearTrend {
    fn forecast_step(&mut self, window: &[f64]) -> std::result::Result<f64, BoxError> {
        // A single point has no slope; fall back to repeating it
        if window.len() == 1 {
            return Ok(window[0]);
        }
        let (slope, intercept) = Self::fit(window)?;
        Ok(slope * window.len() as f64 + intercept)
    }

    fn name(&self) -> &str {
        "linear_trend"
    }
}
