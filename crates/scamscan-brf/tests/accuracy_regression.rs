//! Accuracy regression tests for scamscan-brf.
//!
//! These tests verify that algorithmic changes do not degrade detection
//! quality on a deterministic, heavily imbalanced synthetic dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use scamscan_brf::{
    BalancedForest, BalancedForestConfig, Class, LabeledPool, PartitionedValidation, TreeLearner,
    TreeLearnerFactory, TreeScoring, default_thresholds,
};

// ---------------------------------------------------------------------------
// Helper: deterministic imbalanced pools
// ---------------------------------------------------------------------------

/// Generate 600 legit and 80 scam rows with 6 features.
///
/// Features 0-2 are informative: legit values lie in [0, 1), scam values in
/// [1, 2). Features 3-5 are noise in [0, 1) for both classes.
fn make_pools() -> (LabeledPool, LabeledPool) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut row = |base: f64| -> Vec<f64> {
        (0..6)
            .map(|f| {
                let offset = if f < 3 { base } else { 0.0 };
                offset + rng.r#gen::<f64>()
            })
            .collect()
    };
    let legit: Vec<Vec<f64>> = (0..600).map(|_| row(0.0)).collect();
    let scam: Vec<Vec<f64>> = (0..80).map(|_| row(1.0)).collect();
    (
        LabeledPool::new(Class::Legit, legit).unwrap(),
        LabeledPool::new(Class::Scam, scam).unwrap(),
    )
}

fn train(n_estimators: usize, scoring: TreeScoring) -> scamscan_brf::TrainingResult<TreeLearner> {
    let (legit, scam) = make_pools();
    let factory = TreeLearnerFactory::default().with_scoring(scoring);
    BalancedForestConfig::new(n_estimators)
        .unwrap()
        .with_seed(42)
        .fit(&factory, &legit, &scam)
        .unwrap()
}

// ---------------------------------------------------------------------------
// a) test_set_f1_above_threshold
// ---------------------------------------------------------------------------

/// F1 at threshold 0.5 on the withheld test set must exceed 0.9.
#[test]
fn test_set_f1_above_threshold() {
    let result = train(100, TreeScoring::Vote);
    let test = result.test_set();
    assert_eq!(test.class_counts(), (16, 16));

    let matrix = result
        .forest()
        .confusion_matrix(test.features(), test.labels(), 0.5)
        .unwrap();
    let f1 = matrix.f1().unwrap();
    assert!(f1 > 0.9, "test-set f1 {f1} <= 0.9\n{matrix}");
}

// ---------------------------------------------------------------------------
// b) roc_area_above_threshold
// ---------------------------------------------------------------------------

/// ROC area over a bracketed threshold grid must exceed 0.9.
#[test]
fn roc_area_above_threshold() {
    let result = train(100, TreeScoring::Probability);
    let test = result.test_set();

    let mut thresholds = vec![0.0];
    thresholds.extend(default_thresholds());
    thresholds.push(1.5);

    let scored = result.forest().score_set(test.features(), test.labels()).unwrap();
    let area = scored.roc_curve(&thresholds).unwrap().area().unwrap();
    assert!(area > 0.9, "roc area {area} <= 0.9");
}

// ---------------------------------------------------------------------------
// c) partitioned_validation_mean_f1
// ---------------------------------------------------------------------------

/// Four-way partitioned validation mean F1 must exceed 0.85.
#[test]
fn partitioned_validation_mean_f1() {
    let (legit, scam) = make_pools();
    let config = BalancedForestConfig::new(50).unwrap().with_seed(42);
    let report = PartitionedValidation::new(4)
        .unwrap()
        .evaluate(&config, &TreeLearnerFactory::default(), &legit, &scam)
        .unwrap();

    assert_eq!(report.partitions.len(), 4);
    let mean_f1 = report.mean_f1.unwrap();
    assert!(mean_f1 > 0.85, "validation mean f1 {mean_f1} <= 0.85");
}

// ---------------------------------------------------------------------------
// d) deterministic_predictions
// ---------------------------------------------------------------------------

/// Same config and seed must produce identical test sets and scores.
#[test]
fn deterministic_predictions() {
    let first = train(40, TreeScoring::Probability);
    let second = train(40, TreeScoring::Probability);
    assert_eq!(first.test_set(), second.test_set());

    let (legit, scam) = make_pools();
    let sample_rows: Vec<Vec<f64>> = legit.rows().iter().take(20).chain(scam.rows()).cloned().collect();
    assert_eq!(
        first.forest().predict(&sample_rows).unwrap(),
        second.forest().predict(&sample_rows).unwrap(),
        "scores differ across runs with the same seed"
    );
}

// ---------------------------------------------------------------------------
// e) model_round_trip
// ---------------------------------------------------------------------------

/// A saved and reloaded forest must score the test set identically.
#[test]
fn model_round_trip() {
    let result = train(30, TreeScoring::Vote);
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("scan_model.bin");
    result.forest().save(&path).unwrap();

    let loaded = BalancedForest::<TreeLearner>::load(&path).unwrap();
    let features = result.test_set().features();
    assert_eq!(
        result.forest().predict(features).unwrap(),
        loaded.predict(features).unwrap()
    );
}
