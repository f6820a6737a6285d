//! Error types for the forecast_recon crate

use forecast_math::MathError;
use thiserror::Error;

/// Custom error types for the forecast_recon crate
#[derive(Debug, Error)]
pub enum ReconError {
    /// Malformed tree input, such as a node with two parents
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Hierarchy expansion did not terminate or left nodes unreachable
    #[error("Cycle detected in hierarchy: {0}")]
    CycleDetected(String),

    /// Backtest window larger than the available data
    #[error("Insufficient history: need at least {required} observations, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// The caller-supplied forecaster failed during a rolling step
    #[error("Forecast failed at backtest step {step}: {message}")]
    ForecastStepFailed { step: usize, message: String },

    /// Disaggregation lacks historical shares for a child
    #[error("Missing proportions for child '{child}' of parent '{parent}'")]
    MissingProportions { parent: String, child: String },

    /// Reconciliation method name not recognised
    #[error("Unknown reconciliation method: {0}")]
    UnknownReconciliationMethod(String),

    /// Forecast vectors in one call do not share a horizon
    #[error("Horizon mismatch for node '{node}': expected {expected} steps, found {found}")]
    HorizonMismatch {
        node: String,
        expected: usize,
        found: usize,
    },

    /// Node key not present in the hierarchy
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A node needed by the chosen method has no forecast
    #[error("Missing forecast for node: {0}")]
    MissingForecast(String),

    /// A reconciliation method was selected without its required input
    #[error("Missing parameter '{parameter}' for reconciliation method '{method}'")]
    MissingParameter {
        method: &'static str,
        parameter: &'static str,
    },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from metric calculations
    #[error(transparent)]
    Math(#[from] MathError),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ReconError>;
