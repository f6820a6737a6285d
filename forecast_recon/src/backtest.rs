//! Rolling-window (walk-forward) backtesting
//!
//! The last `test_periods` observations of a series are predicted one at a
//! time. Each prediction sees only the `window_size` observations that come
//! immediately before the point under test, so the forecaster never sees the
//! value it is asked to predict or anything after it.

use crate::error::{ReconError, Result};
use crate::reconcile::ErrorSeriesMap;
use forecast_math::{ForecastMetrics, MetricsCalculator, StepForecaster};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Window sizes for a rolling backtest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Number of trailing observations to predict
    pub test_periods: usize,
    /// Number of observations in each training window
    pub window_size: usize,
    /// Distance between evaluated test points
    pub step_size: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            test_periods: 12,
            window_size: 52,
            step_size: 1,
        }
    }
}

impl BacktestConfig {
    /// Create a config with a step size of one
    pub fn new(test_periods: usize, window_size: usize) -> Result<Self> {
        let config = Self {
            test_periods,
            window_size,
            step_size: 1,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the distance between evaluated test points
    pub fn with_step_size(mut self, step_size: usize) -> Result<Self> {
        self.step_size = step_size;
        self.validate()?;
        Ok(self)
    }

    /// Minimum series length the backtest accepts
    pub fn required_history(&self) -> usize {
        self.window_size + self.test_periods
    }

    /// Check that every size is positive
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("test_periods", self.test_periods),
            ("window_size", self.window_size),
            ("step_size", self.step_size),
        ] {
            if value == 0 {
                return Err(ReconError::InvalidParameter(format!(
                    "{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// One evaluated test point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    /// Offset of the test point within the test periods
    pub step: usize,
    /// Observed value
    pub actual: f64,
    /// Forecast for the observed value
    pub predicted: f64,
    /// `actual - predicted`
    pub error: f64,
    /// `|actual - predicted|`
    pub abs_error: f64,
    /// `error / actual * 100`; infinite when the actual is zero and the error is not
    pub pct_error: f64,
}

impl BacktestRecord {
    fn new(step: usize, actual: f64, predicted: f64) -> Self {
        let error = actual - predicted;
        let pct_error = if actual != 0.0 {
            error / actual * 100.0
        } else if error == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        Self {
            step,
            actual,
            predicted,
            error,
            abs_error: error.abs(),
            pct_error,
        }
    }
}

/// Time-ordered records of a backtest and their aggregate metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// One record per evaluated test point, oldest first
    pub records: Vec<BacktestRecord>,
    /// Metrics over every record
    pub metrics: ForecastMetrics,
}

impl BacktestSummary {
    /// Observed values, oldest first
    pub fn actuals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.actual).collect()
    }

    /// Predictions, oldest first
    pub fn predictions(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.predicted).collect()
    }

    /// Forecast errors (`actual - predicted`), oldest first
    pub fn errors(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.error).collect()
    }

    /// Number of evaluated test points
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing was evaluated
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Replays a one-step forecaster over the tail of a series
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingWindowBacktester {
    config: BacktestConfig,
    calculator: MetricsCalculator,
}

impl RollingWindowBacktester {
    /// Create a backtester, validating the config
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calculator: MetricsCalculator::new(),
        })
    }

    /// The window sizes in use
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the backtest over `series`.
    ///
    /// # Errors
    ///
    /// - [`ReconError::InsufficientHistory`] when the series is shorter than
    ///   `window_size + test_periods`; the forecaster is not called.
    /// - [`ReconError::ForecastStepFailed`] when the forecaster fails; no
    ///   partial result is returned.
    pub fn run<F>(&self, series: &[f64], forecaster: &mut F) -> Result<BacktestSummary>
    where
        F: StepForecaster + ?Sized,
    {
        let BacktestConfig {
            test_periods,
            window_size,
            step_size,
        } = self.config;

        let required = self.config.required_history();
        if series.len() < required {
            return Err(ReconError::InsufficientHistory {
                required,
                available: series.len(),
            });
        }

        let mut records = Vec::with_capacity(test_periods.div_ceil(step_size));
        for offset in (0..test_periods).step_by(step_size) {
            let train_end = series.len() - test_periods + offset;
            let train_start = train_end.saturating_sub(window_size);
            let window = &series[train_start..train_end];
            let actual = series[train_end];

            let predicted = forecaster.forecast_step(window).map_err(|err| {
                ReconError::ForecastStepFailed {
                    step: offset,
                    message: err.to_string(),
                }
            })?;

            debug!(
                step = offset,
                train_start, train_end, actual, predicted, "evaluated backtest step"
            );
            records.push(BacktestRecord::new(offset, actual, predicted));
        }

        let actuals: Vec<f64> = records.iter().map(|r| r.actual).collect();
        let predictions: Vec<f64> = records.iter().map(|r| r.predicted).collect();
        let metrics = self.calculator.compute(&actuals, &predictions)?;

        info!(
            model = forecaster.name(),
            steps = records.len(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            "backtest complete"
        );

        Ok(BacktestSummary { records, metrics })
    }

    /// Backtest every series in `series`, building one forecaster per node.
    ///
    /// Stops at the first node that fails.
    pub fn run_nodes<F, M>(
        &self,
        series: &BTreeMap<String, Vec<f64>>,
        mut make_forecaster: M,
    ) -> Result<BTreeMap<String, BacktestSummary>>
    where
        F: StepForecaster,
        M: FnMut(&str) -> F,
    {
        let mut summaries = BTreeMap::new();
        for (node, values) in series {
            let mut forecaster = make_forecaster(node);
            match self.run(values, &mut forecaster) {
                Ok(summary) => {
                    summaries.insert(node.clone(), summary);
                }
                Err(err) => {
                    warn!(node = %node, error = %err, "node backtest failed");
                    return Err(err);
                }
            }
        }
        Ok(summaries)
    }
}

/// Run a rolling backtest with explicit window sizes
pub fn rolling_window_backtest<F>(
    series: &[f64],
    forecaster: &mut F,
    test_periods: usize,
    window_size: usize,
    step_size: usize,
) -> Result<BacktestSummary>
where
    F: StepForecaster + ?Sized,
{
    let config = BacktestConfig::new(test_periods, window_size)?.with_step_size(step_size)?;
    RollingWindowBacktester::new(config)?.run(series, forecaster)
}

/// Collect the forecast errors of per-node backtests for MinT reconciliation
pub fn error_series(summaries: &BTreeMap<String, BacktestSummary>) -> ErrorSeriesMap {
    summaries
        .iter()
        .map(|(node, summary)| (node.clone(), summary.errors()))
        .collect()
}
