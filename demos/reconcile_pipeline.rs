// Backtests a baseline model on synthetic weekly sales for every leaf of the
// sample hierarchy, then reconciles next-week forecasts with each method.
//
// Run with `RUST_LOG=forecast_recon=debug` to see per-step backtest logs.

use pharma_forecast::math::{BoxError, LinearTrend, StepForecaster};
use pharma_forecast::recon::coherence;
use pharma_forecast::recon::presets::pharma_hierarchy;
use pharma_forecast::recon::{error_series, ProportionMap, ReconciliationKind};
use pharma_forecast::{
    EngineConfig, ForecastMap, HierarchicalReconciler, ReconciliationMethod,
    RollingWindowBacktester,
};
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_json_str(
        r#"{"backtest": {"test_periods": 8, "window_size": 26}}"#,
    )?;
    let reconciler = HierarchicalReconciler::new(pharma_hierarchy()?);
    let hierarchy = reconciler.hierarchy();

    // Synthetic history: a level and a trend per leaf plus a four-week cycle
    let weeks = config.backtest.required_history() + 4;
    let history: BTreeMap<String, Vec<f64>> = hierarchy
        .leaves()
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let base = 200.0 + 25.0 * i as f64;
            let slope = 0.5 + 0.1 * i as f64;
            let series = (0..weeks)
                .map(|t| base + slope * t as f64 + [4.0, -1.0, -3.0, 0.0][t % 4])
                .collect();
            (hierarchy.key(id).to_string(), series)
        })
        .collect();

    println!("=== Leaf backtests ({} weeks) ===", weeks);
    let backtester = RollingWindowBacktester::new(config.backtest)?;
    let summaries = backtester.run_nodes(&history, |_node: &str| LinearTrend::new())?;
    for (node, summary) in &summaries {
        println!(
            "{node:<22} MAE {:>7.3}  WAPE {:>6.2}%  MASE {:>6.3}",
            summary.metrics.mae, summary.metrics.wape, summary.metrics.mase
        );
    }

    let mut base = ForecastMap::new();
    for (node, series) in &history {
        base.insert(node.clone(), vec![LinearTrend::new().forecast_step(series)?]);
    }

    // Shares of every non-root node within its parent at the last observed week
    let bottom_up_history = reconciler.bottom_up(
        &history
            .iter()
            .map(|(node, series)| (node.clone(), series[series.len() - 1..].to_vec()))
            .collect(),
    )?;
    let mut proportions = ProportionMap::new();
    for (_, node) in hierarchy.iter() {
        if let Some(parent) = node.parent() {
            let share =
                bottom_up_history[node.key()][0] / bottom_up_history[hierarchy.key(parent)][0];
            proportions.insert(node.key().to_string(), vec![share]);
        }
    }

    let methods = [
        ReconciliationMethod::BottomUp,
        ReconciliationMethod::top_down(proportions.clone()),
        ReconciliationMethod::middle_out("Brand_A", proportions),
        ReconciliationMethod::mint(error_series(&summaries)),
    ];

    let mut seeded = reconciler.bottom_up(&base)?;
    seeded.retain(|node, _| node == "Total" || node == "Brand_A" || base.contains_key(node));

    for method in &methods {
        let input = match method.kind() {
            ReconciliationKind::BottomUp | ReconciliationKind::MinT => &base,
            ReconciliationKind::TopDown | ReconciliationKind::MiddleOut => &seeded,
        };
        let reconciled = reconciler.reconcile(input, method)?;
        let report = coherence::check(hierarchy, &reconciled, 1e-6);
        info!(method = %method.kind(), coherent = report.is_coherent(), "reconciled");
        println!(
            "\n=== {} ===\nTotal {:>10.2}  Brand_A {:>10.2}  max gap {:.4}",
            method.kind(),
            reconciled.get("Total").map_or(f64::NAN, |v| v[0]),
            reconciled.get("Brand_A").map_or(f64::NAN, |v| v[0]),
            report.max_gap
        );
    }

    Ok(())
}
