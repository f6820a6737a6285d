//! # Pharma Forecast
//!
//! `pharma_forecast` bundles the workspace crates used to evaluate and
//! reconcile brand demand forecasts:
//!
//! - [`math`]: forecast error metrics and baseline one-step forecasters
//! - [`recon`]: hierarchy handling, rolling-window backtests and reconciliation
//!
//! ## Example
//!
//! ```
//! use pharma_forecast::recon::presets::pharma_hierarchy;
//! use pharma_forecast::recon::{ForecastMap, HierarchicalReconciler, ReconciliationMethod};
//!
//! let reconciler = HierarchicalReconciler::new(pharma_hierarchy()?);
//!
//! let mut forecasts = ForecastMap::new();
//! forecasts.insert("Brand_B_US".to_string(), vec![120.0]);
//! forecasts.insert("Brand_B_CA".to_string(), vec![30.0]);
//!
//! let reconciled = reconciler.reconcile(&forecasts, &ReconciliationMethod::BottomUp)?;
//! assert_eq!(reconciled["Brand_B"], vec![150.0]);
//! assert_eq!(reconciled["Total"], vec![150.0]);
//! # Ok::<(), pharma_forecast::recon::ReconError>(())
//! ```

pub use forecast_math as math;
pub use forecast_recon as recon;

pub use forecast_recon::{
    BacktestConfig, EngineConfig, ForecastMap, ForecastMetrics, HierarchicalReconciler,
    ReconError, ReconciliationMethod, RollingWindowBacktester,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
