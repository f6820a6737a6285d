//! Hierarchical forecast reconciliation
//!
//! Base forecasts produced independently for every node of a hierarchy
//! rarely add up: the brand forecast is not the sum of its country
//! forecasts. Reconciliation rewrites them so they do.
//!
//! | Method | Direction | Needs |
//! |--------|-----------|-------|
//! | [`ReconciliationMethod::BottomUp`] | children → parents | nothing |
//! | [`ReconciliationMethod::TopDown`] | parents → children | historical shares |
//! | [`ReconciliationMethod::MiddleOut`] | pivot → ancestors, pivot → subtree | historical shares |
//! | [`ReconciliationMethod::MinT`] | per-node scaling | backtest errors |
//!
//! `MinT` here is the inverse-variance weighting surrogate used by the
//! platform: each node's forecast is scaled by its normalised weight
//! `1 / (var(errors) + epsilon)`. It is not the generalised least squares
//! minimum-trace projection and does not make parents equal the sum of
//! their children.
//!
//! Every method returns a new map. Nodes the method does not touch, including
//! nodes that are not part of the hierarchy, are copied through unchanged.

use crate::config::ReconcileConfig;
use crate::error::{ReconError, Result};
use crate::hierarchy::{Hierarchy, HierarchyBuilder, NodeId};
use forecast_math::stats::{mean, normalize_shares, population_variance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Forecast vectors keyed by node, every vector covering the same horizon
pub type ForecastMap = BTreeMap<String, Vec<f64>>;

/// Historical shares of each child within its parent, oldest first
pub type ProportionMap = BTreeMap<String, Vec<f64>>;

/// Historical forecast errors (`actual - predicted`) keyed by node
pub type ErrorSeriesMap = BTreeMap<String, Vec<f64>>;

/// Stabilising term added to every error variance in MinT weighting
pub const DEFAULT_MINT_EPSILON: f64 = 1e-8;

/// How a child's share is read from its historical proportions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProportionMethod {
    /// Mean of the child's historical shares
    #[default]
    Average,
    /// Most recent historical share
    Last,
    /// Same as `Average`; there is no separate periodic share model
    Seasonal,
}

impl ProportionMethod {
    /// Read one share from a child's history. `None` for an empty history.
    pub fn share(self, history: &[f64]) -> Option<f64> {
        match self {
            ProportionMethod::Average | ProportionMethod::Seasonal => mean(history),
            ProportionMethod::Last => history.last().copied(),
        }
    }

    /// Name used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            ProportionMethod::Average => "average",
            ProportionMethod::Last => "last",
            ProportionMethod::Seasonal => "seasonal",
        }
    }
}

impl FromStr for ProportionMethod {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "average" => Ok(ProportionMethod::Average),
            "last" => Ok(ProportionMethod::Last),
            "seasonal" => Ok(ProportionMethod::Seasonal),
            other => Err(ReconError::InvalidParameter(format!(
                "unknown proportion method '{other}'"
            ))),
        }
    }
}

/// Name of a reconciliation strategy without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationKind {
    #[serde(rename = "bottom_up")]
    BottomUp,
    #[serde(rename = "top_down")]
    TopDown,
    #[serde(rename = "middle_out")]
    MiddleOut,
    #[serde(rename = "mint")]
    MinT,
}

impl ReconciliationKind {
    /// Name used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            ReconciliationKind::BottomUp => "bottom_up",
            ReconciliationKind::TopDown => "top_down",
            ReconciliationKind::MiddleOut => "middle_out",
            ReconciliationKind::MinT => "mint",
        }
    }
}

impl fmt::Display for ReconciliationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationKind {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bottom_up" => Ok(ReconciliationKind::BottomUp),
            "top_down" => Ok(ReconciliationKind::TopDown),
            "middle_out" => Ok(ReconciliationKind::MiddleOut),
            "mint" => Ok(ReconciliationKind::MinT),
            other => Err(ReconError::UnknownReconciliationMethod(other.to_string())),
        }
    }
}

/// A reconciliation strategy together with the inputs it needs
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationMethod {
    /// Replace each parent with the sum of its children
    BottomUp,
    /// Split each parent among its children by historical shares
    TopDown {
        proportions: ProportionMap,
        method: ProportionMethod,
    },
    /// Aggregate from `middle` up to the roots, then split `middle` downwards
    MiddleOut {
        middle: String,
        proportions: ProportionMap,
        method: ProportionMethod,
    },
    /// Scale each node by its normalised inverse error variance
    MinT {
        errors: ErrorSeriesMap,
        epsilon: f64,
    },
}

impl ReconciliationMethod {
    /// Top-down with average shares
    pub fn top_down(proportions: ProportionMap) -> Self {
        ReconciliationMethod::TopDown {
            proportions,
            method: ProportionMethod::Average,
        }
    }

    /// Middle-out around `middle` with average shares
    pub fn middle_out(middle: impl Into<String>, proportions: ProportionMap) -> Self {
        ReconciliationMethod::MiddleOut {
            middle: middle.into(),
            proportions,
            method: ProportionMethod::Average,
        }
    }

    /// MinT weighting with [`DEFAULT_MINT_EPSILON`]
    pub fn mint(errors: ErrorSeriesMap) -> Self {
        ReconciliationMethod::MinT {
            errors,
            epsilon: DEFAULT_MINT_EPSILON,
        }
    }

    /// The strategy this method runs
    pub fn kind(&self) -> ReconciliationKind {
        match self {
            ReconciliationMethod::BottomUp => ReconciliationKind::BottomUp,
            ReconciliationMethod::TopDown { .. } => ReconciliationKind::TopDown,
            ReconciliationMethod::MiddleOut { .. } => ReconciliationKind::MiddleOut,
            ReconciliationMethod::MinT { .. } => ReconciliationKind::MinT,
        }
    }

    /// Assemble a method from configuration and whichever inputs the caller loaded.
    ///
    /// # Errors
    ///
    /// - [`ReconError::UnknownReconciliationMethod`] for an unrecognised name.
    /// - [`ReconError::MissingParameter`] when the selected strategy needs
    ///   proportions, error series or a middle level that were not supplied.
    pub fn from_config(
        config: &ReconcileConfig,
        proportions: Option<ProportionMap>,
        errors: Option<ErrorSeriesMap>,
    ) -> Result<Self> {
        let kind: ReconciliationKind = config.method.parse()?;
        let missing = |parameter: &'static str| ReconError::MissingParameter {
            method: kind.as_str(),
            parameter,
        };

        match kind {
            ReconciliationKind::BottomUp => Ok(ReconciliationMethod::BottomUp),
            ReconciliationKind::TopDown => Ok(ReconciliationMethod::TopDown {
                proportions: proportions.ok_or_else(|| missing("proportions"))?,
                method: config.proportion_method,
            }),
            ReconciliationKind::MiddleOut => Ok(ReconciliationMethod::MiddleOut {
                middle: config
                    .middle_level
                    .clone()
                    .ok_or_else(|| missing("middle_level"))?,
                proportions: proportions.ok_or_else(|| missing("proportions"))?,
                method: config.proportion_method,
            }),
            ReconciliationKind::MinT => Ok(ReconciliationMethod::MinT {
                errors: errors.ok_or_else(|| missing("errors"))?,
                epsilon: config.epsilon,
            }),
        }
    }
}

/// Reconciles forecast maps against one hierarchy
#[derive(Debug, Clone)]
pub struct HierarchicalReconciler {
    hierarchy: Hierarchy,
}

impl HierarchicalReconciler {
    /// Create a reconciler over a built hierarchy
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self { hierarchy }
    }

    /// Build the hierarchy from a parent → children mapping and wrap it
    pub fn from_mapping<I, K, C, S>(mapping: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(HierarchyBuilder::from_mapping(mapping).build()?))
    }

    /// The hierarchy forecasts are reconciled against
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Reconcile `forecasts` with the given method.
    ///
    /// # Errors
    ///
    /// - [`ReconError::HorizonMismatch`] when forecast vectors differ in length.
    /// - [`ReconError::MissingProportions`] when top-down or middle-out
    ///   splitting reaches a child without historical shares.
    /// - [`ReconError::UnknownNode`] / [`ReconError::MissingForecast`] for a
    ///   middle-out pivot that is not in the hierarchy or has nothing to start from.
    pub fn reconcile(
        &self,
        forecasts: &ForecastMap,
        method: &ReconciliationMethod,
    ) -> Result<ForecastMap> {
        let horizon = check_horizon(forecasts)?;
        debug!(
            method = %method.kind(),
            nodes = forecasts.len(),
            horizon = horizon.unwrap_or(0),
            "reconciling forecasts"
        );

        match method {
            ReconciliationMethod::BottomUp => Ok(self.bottom_up_unchecked(forecasts)),
            ReconciliationMethod::TopDown {
                proportions,
                method,
            } => self.top_down_unchecked(forecasts, proportions, *method),
            ReconciliationMethod::MiddleOut {
                middle,
                proportions,
                method,
            } => self.middle_out_unchecked(forecasts, middle, proportions, *method),
            ReconciliationMethod::MinT { errors, epsilon } => {
                mint_unchecked(forecasts, errors, *epsilon)
            }
        }
    }

    /// Bottom-up reconciliation.
    ///
    /// Walks from the deepest level to the roots and replaces every parent
    /// that has at least one forecast child with the elementwise sum of those
    /// children. Children without a forecast count as zero.
    pub fn bottom_up(&self, forecasts: &ForecastMap) -> Result<ForecastMap> {
        check_horizon(forecasts)?;
        Ok(self.bottom_up_unchecked(forecasts))
    }

    /// Top-down reconciliation.
    ///
    /// Walks from the roots down; every parent holding a forecast in
    /// `forecasts` is split among all of its children by their normalised
    /// historical shares, overwriting any forecast the children had. Splits
    /// use the parent's input forecast and do not cascade: a child only
    /// passes a value further down when it had its own input forecast.
    pub fn top_down(
        &self,
        forecasts: &ForecastMap,
        proportions: &ProportionMap,
        method: ProportionMethod,
    ) -> Result<ForecastMap> {
        check_horizon(forecasts)?;
        self.top_down_unchecked(forecasts, proportions, method)
    }

    /// Middle-out reconciliation around the node `middle`.
    ///
    /// The pivot becomes the sum of its children that have forecasts, and
    /// keeps its own forecast only when none of them do. Its ancestors are
    /// re-aggregated bottom-up; a sibling subtree with forecasts only below
    /// its top node is first summed up to that node, but existing sibling
    /// forecasts are not changed. The pivot's subtree is then split
    /// top-down as in [`Self::top_down`].
    pub fn middle_out(
        &self,
        forecasts: &ForecastMap,
        middle: &str,
        proportions: &ProportionMap,
        method: ProportionMethod,
    ) -> Result<ForecastMap> {
        check_horizon(forecasts)?;
        self.middle_out_unchecked(forecasts, middle, proportions, method)
    }

    /// MinT-style inverse-variance weighting.
    pub fn mint(
        &self,
        forecasts: &ForecastMap,
        errors: &ErrorSeriesMap,
        epsilon: f64,
    ) -> Result<ForecastMap> {
        check_horizon(forecasts)?;
        mint_unchecked(forecasts, errors, epsilon)
    }

    fn bottom_up_unchecked(&self, forecasts: &ForecastMap) -> ForecastMap {
        let mut working = forecasts.clone();
        for level in self.hierarchy.levels().iter().rev() {
            for &id in level {
                self.aggregate_children(&mut working, id);
            }
        }
        working
    }

    fn top_down_unchecked(
        &self,
        forecasts: &ForecastMap,
        proportions: &ProportionMap,
        method: ProportionMethod,
    ) -> Result<ForecastMap> {
        let mut working = forecasts.clone();
        for level in self.hierarchy.levels() {
            for &id in level {
                self.disaggregate(forecasts, &mut working, id, proportions, method)?;
            }
        }
        Ok(working)
    }

    fn middle_out_unchecked(
        &self,
        forecasts: &ForecastMap,
        middle: &str,
        proportions: &ProportionMap,
        method: ProportionMethod,
    ) -> Result<ForecastMap> {
        let pivot = self.hierarchy.require(middle)?;
        let mut working = forecasts.clone();

        if !self.aggregate_children(&mut working, pivot) && !working.contains_key(middle) {
            return Err(ReconError::MissingForecast(middle.to_string()));
        }

        let mut below = pivot;
        for ancestor in self.hierarchy.ancestors(pivot) {
            for &sibling in self.hierarchy.children(ancestor) {
                if sibling != below {
                    self.fill_missing(&mut working, sibling);
                }
            }
            self.aggregate_children(&mut working, ancestor);
            below = ancestor;
        }

        let source = working.clone();
        for level in self.hierarchy.subtree_levels(pivot) {
            for id in level {
                self.disaggregate(&source, &mut working, id, proportions, method)?;
            }
        }
        Ok(working)
    }

    /// Overwrite `id` with the sum of its children that have forecasts.
    /// Returns false when there was nothing to sum.
    fn aggregate_children(&self, working: &mut ForecastMap, id: NodeId) -> bool {
        let present: Vec<&Vec<f64>> = self
            .hierarchy
            .children(id)
            .iter()
            .filter_map(|&child| working.get(self.hierarchy.key(child)))
            .collect();

        let Some(first) = present.first() else {
            return false;
        };

        let mut total = vec![0.0; first.len()];
        for values in &present {
            for (slot, value) in total.iter_mut().zip(values.iter()) {
                *slot += value;
            }
        }

        let key = self.hierarchy.key(id);
        trace!(node = key, children = present.len(), "aggregated children");
        working.insert(key.to_string(), total);
        true
    }

    /// Sum up every node of the subtree at `id` that has no forecast yet,
    /// deepest first. Nodes that already have a forecast are kept.
    fn fill_missing(&self, working: &mut ForecastMap, id: NodeId) {
        for level in self.hierarchy.subtree_levels(id).iter().rev() {
            for &node in level {
                if !working.contains_key(self.hierarchy.key(node)) {
                    self.aggregate_children(working, node);
                }
            }
        }
    }

    /// Split the `source` forecast of `id` among its children, writing into
    /// `working`. No-op for leaves and for parents without a source forecast.
    fn disaggregate(
        &self,
        source: &ForecastMap,
        working: &mut ForecastMap,
        id: NodeId,
        proportions: &ProportionMap,
        method: ProportionMethod,
    ) -> Result<()> {
        let children = self.hierarchy.children(id);
        if children.is_empty() {
            return Ok(());
        }
        let parent_key = self.hierarchy.key(id);
        let Some(parent_forecast) = source.get(parent_key) else {
            return Ok(());
        };

        let mut shares = Vec::with_capacity(children.len());
        for &child in children {
            let child_key = self.hierarchy.key(child);
            let share = proportions
                .get(child_key)
                .and_then(|history| method.share(history))
                .ok_or_else(|| ReconError::MissingProportions {
                    parent: parent_key.to_string(),
                    child: child_key.to_string(),
                })?;
            shares.push(share);
        }

        let shares = normalize_shares(&shares);
        for (&child, share) in children.iter().zip(shares) {
            let values = parent_forecast.iter().map(|v| v * share).collect();
            working.insert(self.hierarchy.key(child).to_string(), values);
        }
        trace!(node = parent_key, children = children.len(), "split parent forecast");
        Ok(())
    }
}

/// Reject an epsilon that is not a positive normal float.
///
/// Subnormal values make `1 / epsilon` overflow to infinity.
pub fn check_epsilon(epsilon: f64) -> Result<()> {
    if !(epsilon > 0.0 && epsilon.is_normal()) {
        return Err(ReconError::InvalidParameter(format!(
            "epsilon must be a positive normal number, got {epsilon}"
        )));
    }
    Ok(())
}

/// Normalised inverse-variance weights, one per node in `errors`.
///
/// An empty error series weighs 1.0 before normalisation. Raw weights are
/// scaled by the largest one before summing so the total cannot overflow.
pub fn mint_weights(errors: &ErrorSeriesMap, epsilon: f64) -> Result<BTreeMap<String, f64>> {
    check_epsilon(epsilon)?;

    let raw: Vec<f64> = errors
        .values()
        .map(|series| population_variance(series).map_or(1.0, |var| 1.0 / (var + epsilon)))
        .collect();

    let largest = raw.iter().copied().fold(0.0, f64::max);
    let scaled: Vec<f64> = if largest > 0.0 && largest.is_finite() {
        raw.iter().map(|w| w / largest).collect()
    } else {
        raw
    };

    Ok(errors
        .keys()
        .cloned()
        .zip(normalize_shares(&scaled))
        .collect())
}

fn mint_unchecked(
    forecasts: &ForecastMap,
    errors: &ErrorSeriesMap,
    epsilon: f64,
) -> Result<ForecastMap> {
    let weights = mint_weights(errors, epsilon)?;
    Ok(forecasts
        .iter()
        .map(|(node, values)| {
            let scaled = match weights.get(node) {
                Some(weight) => values.iter().map(|v| v * weight).collect(),
                None => values.clone(),
            };
            (node.clone(), scaled)
        })
        .collect())
}

/// Confirm every vector has the same length; returns that length
fn check_horizon(forecasts: &ForecastMap) -> Result<Option<usize>> {
    let mut expected: Option<usize> = None;
    for (node, values) in forecasts {
        match expected {
            None => expected = Some(values.len()),
            Some(len) if len != values.len() => {
                return Err(ReconError::HorizonMismatch {
                    node: node.clone(),
                    expected: len,
                    found: values.len(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(expected)
}
