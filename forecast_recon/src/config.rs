//! Engine configuration
//!
//! Configuration is plain JSON. Every field has a default, so a partial
//! document such as `{"backtest": {"window_size": 26}}` is valid.

use crate::backtest::BacktestConfig;
use crate::error::{ReconError, Result};
use crate::reconcile::{check_epsilon, ProportionMethod, ReconciliationKind, DEFAULT_MINT_EPSILON};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Settings for choosing and running a reconciliation method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// One of `bottom_up`, `top_down`, `middle_out`, `mint`
    pub method: String,
    /// Share rule for top-down and middle-out splitting
    pub proportion_method: ProportionMethod,
    /// Pivot node for middle-out
    pub middle_level: Option<String>,
    /// Stabilising term for MinT weights
    pub epsilon: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            method: ReconciliationKind::BottomUp.as_str().to_string(),
            proportion_method: ProportionMethod::Average,
            middle_level: None,
            epsilon: DEFAULT_MINT_EPSILON,
        }
    }
}

impl ReconcileConfig {
    /// Parse the configured method name
    pub fn kind(&self) -> Result<ReconciliationKind> {
        self.method.parse()
    }

    /// Check the method name, the epsilon and the middle-out pivot
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind()?;
        check_epsilon(self.epsilon)?;
        if kind == ReconciliationKind::MiddleOut && self.middle_level.is_none() {
            return Err(ReconError::MissingParameter {
                method: kind.as_str(),
                parameter: "middle_level",
            });
        }
        Ok(())
    }
}

/// Top-level configuration for backtests and reconciliation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backtest: BacktestConfig,
    pub reconciliation: ReconcileConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), method = %config.reconciliation.method, "loaded engine config");
        Ok(config)
    }

    /// Render as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.backtest.validate()?;
        self.reconciliation.validate()
    }
}
