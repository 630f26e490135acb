//! Criterion benchmarks for scamscan-brf: balanced training, scoring, and threshold sweeps.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use scamscan_brf::{BalancedForestConfig, Class, LabeledPool, TreeLearnerFactory, default_thresholds};

fn make_pools(n_legit: usize, n_scam: usize, n_features: usize, seed: u64) -> (LabeledPool, LabeledPool) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = |n: usize, base: f64| -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| {
                (0..n_features)
                    .map(|f| {
                        let offset = if f < 3 { base } else { 0.0 };
                        offset + rng.r#gen::<f64>()
                    })
                    .collect()
            })
            .collect()
    };
    let legit = rows(n_legit, 0.0);
    let scam = rows(n_scam, 0.7);
    (
        LabeledPool::new(Class::Legit, legit).unwrap(),
        LabeledPool::new(Class::Scam, scam).unwrap(),
    )
}

fn bench_brf_train(c: &mut Criterion) {
    let (legit, scam) = make_pools(2000, 200, 12, 42);
    let factory = TreeLearnerFactory::default();
    let cfg = BalancedForestConfig::new(100).unwrap().with_seed(42);

    c.bench_function("brf_train_2000x200x12_100est", |b| {
        b.iter(|| cfg.fit(&factory, &legit, &scam).unwrap());
    });
}

fn bench_brf_predict(c: &mut Criterion) {
    let (legit, scam) = make_pools(2000, 200, 12, 42);
    let factory = TreeLearnerFactory::default();
    let cfg = BalancedForestConfig::new(100).unwrap().with_seed(42);
    let forest = cfg.fit(&factory, &legit, &scam).unwrap().into_forest();

    c.bench_function("brf_predict_2000x12_100est", |b| {
        b.iter(|| forest.predict(legit.rows()).unwrap());
    });
}

fn bench_threshold_sweep(c: &mut Criterion) {
    let (legit, scam) = make_pools(2000, 200, 12, 42);
    let factory = TreeLearnerFactory::default();
    let cfg = BalancedForestConfig::new(100).unwrap().with_seed(42);
    let result = cfg.fit(&factory, &legit, &scam).unwrap();
    let test = result.test_set();
    let scored = result.forest().score_set(test.features(), test.labels()).unwrap();
    let thresholds = default_thresholds();

    c.bench_function("brf_roc_sweep_99_thresholds", |b| {
        b.iter(|| scored.roc_curve(&thresholds).unwrap());
    });
}

criterion_group!(benches, bench_brf_train, bench_brf_predict, bench_threshold_sweep);
criterion_main!(benches);
