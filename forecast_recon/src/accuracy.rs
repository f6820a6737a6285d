//! Per-node accuracy of hierarchical forecasts

use crate::reconcile::ForecastMap;
use forecast_math::metrics::compute_metrics;
use forecast_math::ForecastMetrics;
use std::collections::BTreeMap;
use tracing::debug;

/// Evaluate each node that has both actuals and a forecast of equal length.
///
/// Nodes missing from either map, or whose lengths differ, are left out of
/// the result rather than failing the whole report.
pub fn node_accuracy(actual: &ForecastMap, forecast: &ForecastMap) -> BTreeMap<String, ForecastMetrics> {
    let mut report = BTreeMap::new();
    for (node, observed) in actual {
        let Some(predicted) = forecast.get(node) else {
            continue;
        };
        match compute_metrics(observed, predicted) {
            Ok(metrics) => {
                report.insert(node.clone(), metrics);
            }
            Err(err) => debug!(node = %node, error = %err, "skipping node accuracy"),
        }
    }
    report
}
