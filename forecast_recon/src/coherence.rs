//! Aggregation consistency checks
//!
//! After bottom-up or top-down reconciliation every parent equals the sum of
//! its children at every horizon step. [`check`] measures how far a forecast
//! map is from that state, which is useful both as a post-condition and for
//! judging the raw base forecasts before reconciling them.

use crate::hierarchy::Hierarchy;
use crate::reconcile::ForecastMap;
use serde::Serialize;

/// A parent whose forecast differs from the sum of its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceViolation {
    pub parent: String,
    /// Horizon step with the largest gap
    pub step: usize,
    /// Parent forecast at `step`
    pub parent_value: f64,
    /// Sum of the children's forecasts at `step`
    pub children_sum: f64,
}

impl CoherenceViolation {
    /// Absolute difference between parent and children
    pub fn gap(&self) -> f64 {
        (self.parent_value - self.children_sum).abs()
    }
}

/// Result of a coherence check
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoherenceReport {
    /// Parents checked (those with a forecast and at least one forecast child)
    pub checked: usize,
    /// Parents whose gap exceeds the tolerance
    pub violations: Vec<CoherenceViolation>,
    /// Largest gap seen over all checked parents
    pub max_gap: f64,
}

impl CoherenceReport {
    /// True when no parent exceeds the tolerance
    pub fn is_coherent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Compare every parent forecast with the sum of its present children.
///
/// Parents without a forecast, and parents none of whose children have one,
/// are skipped. Missing children count as zero.
pub fn check(hierarchy: &Hierarchy, forecasts: &ForecastMap, tolerance: f64) -> CoherenceReport {
    let mut report = CoherenceReport::default();

    for level in hierarchy.levels() {
        for &id in level {
            let Some(parent) = forecasts.get(hierarchy.key(id)) else {
                continue;
            };
            let children: Vec<&Vec<f64>> = hierarchy
                .children(id)
                .iter()
                .filter_map(|&child| forecasts.get(hierarchy.key(child)))
                .collect();
            if children.is_empty() {
                continue;
            }
            report.checked += 1;

            let mut worst: Option<CoherenceViolation> = None;
            for (step, &parent_value) in parent.iter().enumerate() {
                let children_sum: f64 = children
                    .iter()
                    .map(|values| values.get(step).copied().unwrap_or(0.0))
                    .sum();
                let candidate = CoherenceViolation {
                    parent: hierarchy.key(id).to_string(),
                    step,
                    parent_value,
                    children_sum,
                };
                if worst.as_ref().map_or(true, |w| candidate.gap() > w.gap()) {
                    worst = Some(candidate);
                }
            }

            if let Some(worst) = worst {
                report.max_gap = report.max_gap.max(worst.gap());
                if worst.gap() > tolerance {
                    report.violations.push(worst);
                }
            }
        }
    }
    report
}
