//! # Forecast Recon
//!
//! Hierarchical reconciliation and rolling-window backtesting for demand
//! forecasts organised as a tree (total → brand → country → channel).
//!
//! ## Features
//!
//! - Hierarchy parsing into ordered levels, with cycle and shape checks
//! - Rolling-window backtests for any one-step forecaster, including closures
//! - Bottom-up, top-down, middle-out and MinT-style reconciliation
//! - Coherence checks and per-node accuracy reports
//! - JSON configuration with defaults for every field
//!
//! ## Quick Start
//!
//! ```rust
//! use forecast_recon::{HierarchicalReconciler, ReconciliationMethod, ForecastMap};
//!
//! let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B"])])?;
//!
//! let mut forecasts = ForecastMap::new();
//! forecasts.insert("A".to_string(), vec![10.0, 20.0]);
//! forecasts.insert("B".to_string(), vec![5.0, 15.0]);
//!
//! let reconciled = reconciler.reconcile(&forecasts, &ReconciliationMethod::BottomUp)?;
//! assert_eq!(reconciled["Total"], vec![15.0, 35.0]);
//! # Ok::<(), forecast_recon::ReconError>(())
//! ```
//!
//! Backtesting a closure:
//!
//! ```rust
//! use forecast_recon::rolling_window_backtest;
//!
//! let series: Vec<f64> = (10..=16).map(f64::from).collect();
//! let mut last = |window: &[f64]| -> Result<f64, std::convert::Infallible> {
//!     Ok(window[window.len() - 1])
//! };
//! let summary = rolling_window_backtest(&series, &mut last, 2, 3, 1)?;
//! assert_eq!(summary.actuals(), vec![15.0, 16.0]);
//! # Ok::<(), forecast_recon::ReconError>(())
//! ```

pub mod accuracy;
pub mod backtest;
pub mod coherence;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod presets;
pub mod reconcile;

// Re-export commonly used types
pub use crate::backtest::{
    error_series, rolling_window_backtest, BacktestConfig, BacktestRecord, BacktestSummary,
    RollingWindowBacktester,
};
pub use crate::coherence::{CoherenceReport, CoherenceViolation};
pub use crate::config::{EngineConfig, ReconcileConfig};
pub use crate::error::{ReconError, Result};
pub use crate::hierarchy::{build_levels, Hierarchy, HierarchyBuilder, HierarchyNode, NodeId};
pub use crate::reconcile::{
    check_epsilon, mint_weights, ErrorSeriesMap, ForecastMap, HierarchicalReconciler,
    ProportionMap, ProportionMethod, ReconciliationKind, ReconciliationMethod,
    DEFAULT_MINT_EPSILON,
};
pub use forecast_math::{ForecastMetrics, StepForecaster};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
