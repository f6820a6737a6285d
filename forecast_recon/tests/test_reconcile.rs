use approx::assert_relative_eq;
use forecast_recon::accuracy::node_accuracy;
use forecast_recon::coherence;
use forecast_recon::{
    mint_weights, ErrorSeriesMap, ForecastMap, HierarchicalReconciler, ProportionMap,
    ProportionMethod, ReconError, ReconcileConfig, ReconciliationKind, ReconciliationMethod,
};
use pretty_assertions::assert_eq;

fn map(entries: Vec<(&str, Vec<f64>)>) -> ForecastMap {
    entries
        .into_iter()
        .map(|(node, values)| (node.to_string(), values))
        .collect()
}

/// Total → [A, B], A → [A1, A2]
fn reconciler() -> HierarchicalReconciler {
    HierarchicalReconciler::from_mapping(vec![("Total", vec!["A", "B"]), ("A", vec!["A1", "A2"])])
        .unwrap()
}

fn assert_values(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = 1e-9);
    }
}

#[test]
fn test_bottom_up_two_level() {
    let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B"])]).unwrap();
    let forecasts = map(vec![("A", vec![10.0, 20.0]), ("B", vec![5.0, 15.0])]);

    let reconciled = reconciler.bottom_up(&forecasts).unwrap();

    assert_eq!(
        reconciled,
        map(vec![
            ("A", vec![10.0, 20.0]),
            ("B", vec![5.0, 15.0]),
            ("Total", vec![15.0, 35.0]),
        ])
    );
}

#[test]
fn test_bottom_up_overwrites_parents_and_keeps_strangers() {
    let forecasts = map(vec![
        ("Total", vec![100.0, 100.0]),
        ("A", vec![50.0, 50.0]),
        ("A1", vec![1.0, 2.0]),
        ("A2", vec![3.0, 4.0]),
        ("B", vec![5.0, 6.0]),
        ("Other", vec![7.0, 7.0]),
    ]);

    let reconciled = reconciler().bottom_up(&forecasts).unwrap();

    assert_eq!(reconciled["A"], vec![4.0, 6.0]);
    assert_eq!(reconciled["Total"], vec![9.0, 12.0]);
    assert_eq!(reconciled["Other"], vec![7.0, 7.0]);
    assert!(coherence::check(reconciler().hierarchy(), &reconciled, 1e-9).is_coherent());
}

#[test]
fn test_bottom_up_is_idempotent() {
    let forecasts = map(vec![
        ("A1", vec![1.5, 2.5]),
        ("A2", vec![3.25, 4.0]),
        ("B", vec![5.0, 6.75]),
    ]);
    let reconciler = reconciler();
    let once = reconciler.bottom_up(&forecasts).unwrap();
    let twice = reconciler.bottom_up(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_bottom_up_keeps_parent_without_forecast_children() {
    let forecasts = map(vec![("Total", vec![42.0])]);
    let reconciled = reconciler().bottom_up(&forecasts).unwrap();
    assert_eq!(reconciled, forecasts);
}

#[test]
fn test_bottom_up_partial_children() {
    let forecasts = map(vec![("A1", vec![2.0]), ("B", vec![3.0])]);
    let reconciled = reconciler().bottom_up(&forecasts).unwrap();
    assert_eq!(reconciled["A"], vec![2.0]);
    assert_eq!(reconciled["Total"], vec![5.0]);
    assert!(!reconciled.contains_key("A2"));
}

#[test]
fn test_top_down_normalises_shares() {
    let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B"])]).unwrap();
    let forecasts = map(vec![("Total", vec![100.0, 200.0])]);
    let proportions = map(vec![("A", vec![3.0]), ("B", vec![1.0])]);

    let reconciled = reconciler
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap();

    assert_eq!(reconciled["A"], vec![75.0, 150.0]);
    assert_eq!(reconciled["B"], vec![25.0, 50.0]);
    assert_eq!(reconciled["Total"], vec![100.0, 200.0]);
}

#[test]
fn test_top_down_splits_each_input_forecast() {
    let forecasts = map(vec![("Total", vec![100.0]), ("A", vec![80.0]), ("A1", vec![999.0])]);
    let proportions = map(vec![
        ("A", vec![0.6, 0.6]),
        ("B", vec![0.4, 0.4]),
        ("A1", vec![0.5]),
        ("A2", vec![0.5]),
    ]);

    let reconciled = reconciler()
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap();

    assert_values(&reconciled["A"], &[60.0]);
    assert_values(&reconciled["B"], &[40.0]);
    // A is split from its own input forecast, not from its share of Total
    assert_values(&reconciled["A1"], &[40.0]);
    assert_values(&reconciled["A2"], &[40.0]);
}

#[test]
fn test_top_down_needs_shares_only_below_forecast_parents() {
    let forecasts = map(vec![("Total", vec![100.0])]);
    let proportions = map(vec![("A", vec![0.6]), ("B", vec![0.4])]);

    let reconciled = reconciler()
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap();

    assert_values(&reconciled["A"], &[60.0]);
    assert_values(&reconciled["B"], &[40.0]);
    assert!(!reconciled.contains_key("A1"));
    assert!(!reconciled.contains_key("A2"));
    assert!(coherence::check(reconciler().hierarchy(), &reconciled, 1e-9).is_coherent());
}

#[test]
fn test_top_down_last_share() {
    let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B"])]).unwrap();
    let forecasts = map(vec![("Total", vec![10.0])]);
    let proportions = map(vec![("A", vec![0.1, 0.9]), ("B", vec![0.9, 0.1])]);

    let last = reconciler
        .top_down(&forecasts, &proportions, ProportionMethod::Last)
        .unwrap();
    assert_values(&last["A"], &[9.0]);

    let average = reconciler
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap();
    assert_values(&average["A"], &[5.0]);
}

#[test]
fn test_top_down_zero_shares_split_equally() {
    let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B", "C", "D"])]).unwrap();
    let forecasts = map(vec![("Total", vec![8.0])]);
    let proportions = map(vec![
        ("A", vec![0.0]),
        ("B", vec![0.0]),
        ("C", vec![0.0]),
        ("D", vec![0.0]),
    ]);

    let reconciled = reconciler
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap();
    for child in ["A", "B", "C", "D"] {
        assert_eq!(reconciled[child], vec![2.0]);
    }
}

#[test]
fn test_top_down_missing_proportions() {
    let reconciler = HierarchicalReconciler::from_mapping([("Total", ["A", "B"])]).unwrap();
    let forecasts = map(vec![("Total", vec![10.0])]);
    let proportions = map(vec![("A", vec![1.0])]);

    let err = reconciler
        .top_down(&forecasts, &proportions, ProportionMethod::Average)
        .unwrap_err();
    assert!(matches!(
        err,
        ReconError::MissingProportions { ref parent, ref child } if parent == "Total" && child == "B"
    ));

    let empty_history = map(vec![("A", vec![1.0]), ("B", vec![])]);
    assert!(reconciler
        .top_down(&forecasts, &empty_history, ProportionMethod::Last)
        .is_err());
}

#[test]
fn test_middle_out_rebuilds_pivot_from_children() {
    let forecasts = map(vec![
        ("Total", vec![999.0]),
        ("A", vec![10.0]),
        ("B", vec![5.0]),
        ("A1", vec![1.0]),
        ("A2", vec![1.0]),
    ]);
    let proportions = map(vec![("A1", vec![0.25]), ("A2", vec![0.75])]);

    let reconciled = reconciler()
        .middle_out(&forecasts, "A", &proportions, ProportionMethod::Average)
        .unwrap();

    assert_eq!(
        reconciled,
        map(vec![
            ("A", vec![2.0]),
            ("A1", vec![0.5]),
            ("A2", vec![1.5]),
            ("B", vec![5.0]),
            ("Total", vec![7.0]),
        ])
    );
}

#[test]
fn test_middle_out_pivot_keeps_forecast_without_children() {
    let forecasts = map(vec![("A", vec![10.0]), ("B", vec![5.0])]);
    let proportions = map(vec![("A1", vec![0.25]), ("A2", vec![0.75])]);

    let reconciled = reconciler()
        .middle_out(&forecasts, "A", &proportions, ProportionMethod::Average)
        .unwrap();

    assert_eq!(reconciled["A"], vec![10.0]);
    assert_eq!(reconciled["A1"], vec![2.5]);
    assert_eq!(reconciled["A2"], vec![7.5]);
    assert_eq!(reconciled["Total"], vec![15.0]);
}

#[test]
fn test_middle_out_folds_in_sibling_leaves() {
    let reconciler = HierarchicalReconciler::from_mapping(vec![
        ("Total", vec!["A", "B"]),
        ("A", vec!["A1", "A2"]),
        ("B", vec!["B1", "B2"]),
    ])
    .unwrap();
    let forecasts = map(vec![
        ("A", vec![10.0]),
        ("B1", vec![3.0]),
        ("B2", vec![4.0]),
    ]);
    let proportions = map(vec![("A1", vec![1.0]), ("A2", vec![1.0])]);

    let reconciled = reconciler
        .middle_out(&forecasts, "A", &proportions, ProportionMethod::Average)
        .unwrap();

    assert_eq!(reconciled["B"], vec![7.0]);
    assert_eq!(reconciled["B1"], vec![3.0]);
    assert_eq!(reconciled["Total"], vec![17.0]);
    assert!(coherence::check(reconciler.hierarchy(), &reconciled, 1e-9).is_coherent());
}

#[test]
fn test_middle_out_keeps_existing_sibling_forecast() {
    let reconciler = HierarchicalReconciler::from_mapping(vec![
        ("Total", vec!["A", "B"]),
        ("B", vec!["B1", "B2"]),
    ])
    .unwrap();
    let forecasts = map(vec![("A", vec![10.0]), ("B", vec![20.0]), ("B1", vec![3.0])]);

    let reconciled = reconciler
        .middle_out(&forecasts, "A", &ProportionMap::new(), ProportionMethod::Average)
        .unwrap();

    assert_eq!(reconciled["B"], vec![20.0]);
    assert_eq!(reconciled["Total"], vec![30.0]);
}

#[test]
fn test_middle_out_pivot_from_children() {
    let forecasts = map(vec![("A1", vec![2.0]), ("A2", vec![3.0]), ("B", vec![1.0])]);
    let proportions = map(vec![("A1", vec![1.0]), ("A2", vec![1.0])]);

    let reconciled = reconciler()
        .middle_out(&forecasts, "A", &proportions, ProportionMethod::Average)
        .unwrap();

    assert_eq!(reconciled["A"], vec![5.0]);
    assert_eq!(reconciled["A1"], vec![2.5]);
    assert_eq!(reconciled["A2"], vec![2.5]);
    assert_eq!(reconciled["Total"], vec![6.0]);
}

#[test]
fn test_middle_out_errors() {
    let proportions = ProportionMap::new();

    let err = reconciler()
        .middle_out(&map(vec![("B", vec![1.0])]), "Z", &proportions, ProportionMethod::Average)
        .unwrap_err();
    assert!(matches!(err, ReconError::UnknownNode(ref key) if key == "Z"));

    let err = reconciler()
        .middle_out(&map(vec![("B", vec![1.0])]), "A", &proportions, ProportionMethod::Average)
        .unwrap_err();
    assert!(matches!(err, ReconError::MissingForecast(ref key) if key == "A"));
}

#[test]
fn test_mint_scales_by_inverse_variance() {
    let forecasts = map(vec![("A", vec![10.0, 20.0]), ("B", vec![10.0, 20.0]), ("C", vec![7.0, 7.0])]);
    let errors: ErrorSeriesMap = map(vec![("A", vec![1.0, -1.0]), ("B", vec![2.0, -2.0])]);

    let reconciled = reconciler().mint(&forecasts, &errors, 1e-12).unwrap();

    // variances 1 and 4 give weights 0.8 and 0.2
    assert_values(&reconciled["A"], &[8.0, 16.0]);
    assert_values(&reconciled["B"], &[2.0, 4.0]);
    assert_eq!(reconciled["C"], vec![7.0, 7.0]);
}

#[test]
fn test_mint_zero_variance_with_tiny_epsilon() {
    let errors = map(vec![("A", vec![1.0, 1.0]), ("B", vec![1.0, 3.0])]);

    let weights = mint_weights(&errors, f64::MIN_POSITIVE).unwrap();
    assert!(weights.values().all(|w| w.is_finite()));
    assert_relative_eq!(weights.values().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(weights["A"], 1.0, epsilon = 1e-12);

    let err = mint_weights(&errors, 1e-320).unwrap_err();
    assert!(matches!(err, ReconError::InvalidParameter(_)));
}

#[test]
fn test_mint_many_zero_variance_nodes_do_not_overflow() {
    let errors: ErrorSeriesMap = (0..64)
        .map(|i| (format!("node_{i}"), vec![2.0, 2.0, 2.0]))
        .collect();

    let weights = mint_weights(&errors, f64::MIN_POSITIVE).unwrap();
    for weight in weights.values() {
        assert_relative_eq!(*weight, 1.0 / 64.0, epsilon = 1e-12);
    }
}

#[test]
fn test_mint_empty_error_series_weighs_one() {
    let forecasts = map(vec![("A", vec![10.0]), ("B", vec![10.0])]);
    let errors = map(vec![("A", vec![]), ("B", vec![])]);
    let reconciled = reconciler().mint(&forecasts, &errors, 1e-8).unwrap();
    assert_values(&reconciled["A"], &[5.0]);
    assert_values(&reconciled["B"], &[5.0]);
}

#[test]
fn test_reconcile_dispatches_each_method() {
    let reconciler = reconciler();
    let forecasts = map(vec![("Total", vec![12.0]), ("A", vec![8.0]), ("A1", vec![4.0]), ("A2", vec![4.0]), ("B", vec![4.0])]);
    let proportions = map(vec![("A", vec![2.0]), ("B", vec![1.0]), ("A1", vec![1.0]), ("A2", vec![3.0])]);
    let errors = map(vec![("A", vec![1.0, 2.0])]);

    let cases = vec![
        (
            ReconciliationMethod::BottomUp,
            reconciler.bottom_up(&forecasts).unwrap(),
        ),
        (
            ReconciliationMethod::top_down(proportions.clone()),
            reconciler
                .top_down(&forecasts, &proportions, ProportionMethod::Average)
                .unwrap(),
        ),
        (
            ReconciliationMethod::middle_out("A", proportions.clone()),
            reconciler
                .middle_out(&forecasts, "A", &proportions, ProportionMethod::Average)
                .unwrap(),
        ),
        (
            ReconciliationMethod::mint(errors.clone()),
            reconciler.mint(&forecasts, &errors, 1e-8).unwrap(),
        ),
    ];

    for (method, expected) in cases {
        assert_eq!(reconciler.reconcile(&forecasts, &method).unwrap(), expected);
    }
}

#[test]
fn test_horizon_mismatch_is_rejected_by_every_method() {
    let reconciler = reconciler();
    let forecasts = map(vec![("A1", vec![1.0, 2.0]), ("A2", vec![1.0])]);

    assert!(matches!(
        reconciler.bottom_up(&forecasts),
        Err(ReconError::HorizonMismatch { .. })
    ));
    assert!(matches!(
        reconciler.mint(&forecasts, &ErrorSeriesMap::new(), 1e-8),
        Err(ReconError::HorizonMismatch { .. })
    ));
    assert!(matches!(
        reconciler.reconcile(&forecasts, &ReconciliationMethod::top_down(ProportionMap::new())),
        Err(ReconError::HorizonMismatch { .. })
    ));
}

#[test]
fn test_from_config_requires_inputs() {
    let mut config = ReconcileConfig::default();
    assert_eq!(
        ReconciliationMethod::from_config(&config, None, None).unwrap(),
        ReconciliationMethod::BottomUp
    );

    config.method = "top_down".to_string();
    let err = ReconciliationMethod::from_config(&config, None, None).unwrap_err();
    assert!(matches!(
        err,
        ReconError::MissingParameter { method: "top_down", parameter: "proportions" }
    ));

    config.method = "middle_out".to_string();
    let err = ReconciliationMethod::from_config(&config, Some(ProportionMap::new()), None)
        .unwrap_err();
    assert!(matches!(err, ReconError::MissingParameter { parameter: "middle_level", .. }));

    config.method = "mint".to_string();
    config.epsilon = 0.5;
    let method =
        ReconciliationMethod::from_config(&config, None, Some(ErrorSeriesMap::new())).unwrap();
    assert_eq!(method.kind(), ReconciliationKind::MinT);
    assert!(matches!(method, ReconciliationMethod::MinT { epsilon, .. } if epsilon == 0.5));

    config.method = "optimal_combination".to_string();
    let err = ReconciliationMethod::from_config(&config, None, None).unwrap_err();
    assert!(matches!(err, ReconError::UnknownReconciliationMethod(ref name) if name == "optimal_combination"));
}

#[test]
fn test_coherence_reports_largest_gap() {
    let forecasts = map(vec![
        ("Total", vec![10.0, 20.0]),
        ("A", vec![6.0, 6.0]),
        ("B", vec![4.0, 4.0]),
        ("A1", vec![6.0, 6.0]),
    ]);
    let report = coherence::check(reconciler().hierarchy(), &forecasts, 1e-9);

    assert_eq!(report.checked, 2);
    assert!(!report.is_coherent());
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].parent, "Total");
    assert_eq!(report.violations[0].step, 1);
    assert_eq!(report.violations[0].gap(), 10.0);
    assert_eq!(report.max_gap, 10.0);
}

#[test]
fn test_node_accuracy_skips_unmatched_nodes() {
    let actual = map(vec![
        ("A", vec![10.0, 20.0]),
        ("B", vec![5.0]),
        ("C", vec![1.0]),
    ]);
    let forecast = map(vec![("A", vec![12.0, 18.0]), ("B", vec![5.0, 6.0])]);

    let report = node_accuracy(&actual, &forecast);

    assert_eq!(report.keys().map(String::as_str).collect::<Vec<_>>(), vec!["A"]);
    assert_relative_eq!(report["A"].mae, 2.0, epsilon = 1e-10);
}
