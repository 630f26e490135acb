//! Balanced forest training with parallel bootstrap-and-fit cycles.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::BalancedForestConfig;
use crate::error::BrfError;
use crate::learner::{BaseLearner, LearnerFactory};
use crate::pool::LabeledPool;
use crate::result::{TrainingMetadata, TrainingResult};

/// A trained ensemble of base learners.
///
/// The forest owns its learners outright; it is only ever grown by
/// training from scratch or replaced by loading a stored model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BalancedForest<L> {
    pub(crate) learners: Vec<L>,
    pub(crate) n_features: usize,
    pub(crate) seed: u64,
    /// Column names in training order; empty when not recorded.
    pub(crate) feature_names: Vec<String>,
}

impl<L> BalancedForest<L> {
    /// Assemble a forest from already-trained learners.
    ///
    /// `seed` is recorded for auditing only. An empty `learners` vector is
    /// accepted, but prediction on it fails with [`BrfError::UntrainedModel`].
    #[must_use]
    pub fn from_learners(learners: Vec<L>, n_features: usize, seed: u64) -> Self {
        Self {
            learners,
            n_features,
            seed,
            feature_names: Vec::new(),
        }
    }

    /// Record the column names the forest was trained on.
    ///
    /// Stored with the model so a scoring file can be checked for the same
    /// column order.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::FeatureNameCountMismatch`] unless there is exactly
    /// one name per feature.
    pub fn with_feature_names(mut self, feature_names: Vec<String>) -> Result<Self, BrfError> {
        if feature_names.len() != self.n_features {
            return Err(BrfError::FeatureNameCountMismatch {
                expected: self.n_features,
                got: feature_names.len(),
            });
        }
        self.feature_names = feature_names;
        Ok(self)
    }

    /// Return the recorded column names, if any.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(&self.feature_names)
        }
    }

    /// Return the learners in training order.
    #[must_use]
    pub fn learners(&self) -> &[L] {
        &self.learners
    }

    /// Return the number of learners.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.learners.len()
    }

    /// Return the feature dimensionality the forest expects.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the seed the bootstrap samples were drawn with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Train the balanced forest.
#[instrument(skip_all, fields(n_estimators = config.n_estimators, n_legit = legit.len(), n_scam = scam.len()))]
pub(crate) fn train<F: LearnerFactory>(
    config: &BalancedForestConfig,
    factory: &F,
    legit: &LabeledPool,
    scam: &LabeledPool,
) -> Result<TrainingResult<F::Learner>, BrfError> {
    let sampler = config.sampler()?;

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let split = sampler.split(legit, scam, &mut master_rng)?;
    let draw_count = sampler.draw_count(split.remainder_legit().len(), split.remainder_scam().len());

    info!(
        n_estimators = config.n_estimators,
        n_features = legit.n_features(),
        test_rows = split.test_set().len(),
        draw_count,
        "training balanced forest"
    );

    // (sample seed, learner seed) per cycle, drawn up front so results do not
    // depend on which worker runs which cycle.
    let cycle_seeds: Vec<(u64, u64)> = (0..config.n_estimators)
        .map(|_| (master_rng.r#gen(), master_rng.r#gen()))
        .collect();

    let learners: Vec<F::Learner> = cycle_seeds
        .into_par_iter()
        .map(|(sample_seed, learner_seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(sample_seed);
            let sample = sampler.draw(&split, &mut rng)?;
            let mut learner = factory.create(learner_seed);
            learner.fit(sample.features(), sample.labels())?;
            Ok(learner)
        })
        .collect::<Result<_, BrfError>>()?;

    debug!(n_learners = learners.len(), "learner training complete");

    let metadata = TrainingMetadata {
        n_estimators: config.n_estimators,
        n_features: legit.n_features(),
        n_legit: legit.len(),
        n_scam: scam.len(),
        test_size_per_class: split.test_set().len() / 2,
        draw_count,
        seed: config.seed,
    };

    let forest = BalancedForest {
        learners,
        n_features: legit.n_features(),
        seed: config.seed,
        feature_names: Vec::new(),
    };

    info!("balanced forest training complete");

    Ok(TrainingResult::new(forest, split.into_test_set(), metadata))
}

pub(crate) fn check_trained<L>(forest: &BalancedForest<L>) -> Result<(), BrfError> {
    if forest.learners.is_empty() {
        return Err(BrfError::UntrainedModel);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::TreeLearnerFactory;
    use crate::pool::Class;
    use crate::tree::{DecisionTreeConfig, MaxFeatures};

    /// Legit rows cluster near 0, scam rows near 10, on the first feature.
    fn make_pools(n_legit: usize, n_scam: usize) -> (LabeledPool, LabeledPool) {
        let legit = (0..n_legit)
            .map(|i| vec![(i % 7) as f64 * 0.3, 0.5, (i % 3) as f64])
            .collect();
        let scam = (0..n_scam)
            .map(|i| vec![10.0 + (i % 5) as f64 * 0.3, 0.5, (i % 3) as f64])
            .collect();
        (
            LabeledPool::new(Class::Legit, legit).unwrap(),
            LabeledPool::new(Class::Scam, scam).unwrap(),
        )
    }

    fn factory() -> TreeLearnerFactory {
        TreeLearnerFactory::new(DecisionTreeConfig::new().with_max_features(MaxFeatures::All))
    }

    #[test]
    fn grows_exactly_n_estimators() {
        let (legit, scam) = make_pools(100, 20);
        let result = BalancedForestConfig::new(25)
            .unwrap()
            .fit(&factory(), &legit, &scam)
            .unwrap();
        assert_eq!(result.forest().n_estimators(), 25);
        assert_eq!(result.forest().n_features(), 3);
        assert_eq!(result.forest().seed(), 42);
    }

    #[test]
    fn caches_balanced_test_set() {
        let (legit, scam) = make_pools(100, 20);
        let result = BalancedForestConfig::new(3)
            .unwrap()
            .fit(&factory(), &legit, &scam)
            .unwrap();
        assert_eq!(result.test_set().class_counts(), (4, 4));
        let meta = result.metadata();
        assert_eq!(meta.test_size_per_class, 4);
        assert_eq!(meta.draw_count, 16);
        assert_eq!(meta.n_legit, 100);
        assert_eq!(meta.n_scam, 20);
    }

    #[test]
    fn separable_pools_score_test_set_correctly() {
        let (legit, scam) = make_pools(100, 20);
        let result = BalancedForestConfig::new(30)
            .unwrap()
            .with_seed(7)
            .fit(&factory(), &legit, &scam)
            .unwrap();
        let test = result.test_set();
        let classes = result.forest().classify(test.features(), 0.5).unwrap();
        assert_eq!(classes, test.labels());
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (legit, scam) = make_pools(60, 15);
        let sample_rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 * 0.6, 0.5, 1.0]).collect();
        let run = || {
            let result = BalancedForestConfig::new(12)
                .unwrap()
                .with_seed(99)
                .fit(&factory(), &legit, &scam)
                .unwrap();
            let scores = result.forest().predict(&sample_rows).unwrap();
            (result.test_set().clone(), scores)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn feature_names_must_match_width() {
        let (legit, scam) = make_pools(40, 10);
        let forest = BalancedForestConfig::new(2)
            .unwrap()
            .fit(&factory(), &legit, &scam)
            .unwrap()
            .into_forest();
        assert!(forest.feature_names().is_none());

        let err = forest.clone().with_feature_names(vec!["a".into()]).unwrap_err();
        assert!(matches!(err, BrfError::FeatureNameCountMismatch { expected: 3, got: 1 }));

        let named = forest
            .with_feature_names(vec!["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(named.feature_names().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn invalid_estimator_count() {
        assert!(matches!(
            BalancedForestConfig::new(0),
            Err(BrfError::InvalidEstimatorCount { n_estimators: 0 })
        ));
    }

    #[test]
    fn invalid_train_fraction_aborts_training() {
        let (legit, scam) = make_pools(20, 10);
        let err = BalancedForestConfig::new(2)
            .unwrap()
            .with_train_fraction(0.0)
            .fit(&factory(), &legit, &scam)
            .unwrap_err();
        assert!(matches!(err, BrfError::InvalidTrainFraction { .. }));
    }

    #[test]
    fn single_fit_failure_aborts_whole_run() {
        // max_features = 5 exceeds the 3 columns, so every fit fails.
        let bad = TreeLearnerFactory::new(DecisionTreeConfig::new().with_max_features(MaxFeatures::Fixed(5)));
        let (legit, scam) = make_pools(40, 10);
        let err = BalancedForestConfig::new(8)
            .unwrap()
            .fit(&bad, &legit, &scam)
            .unwrap_err();
        assert!(matches!(err, BrfError::InvalidMaxFeatures { .. }));
    }
}
