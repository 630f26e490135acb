//! Configuration builder for balanced forest training.

use crate::error::BrfError;
use crate::learner::LearnerFactory;
use crate::pool::LabeledPool;
use crate::result::TrainingResult;
use crate::sampler::{BalancedSampler, ReferenceClass};

/// Configuration for balanced forest training.
///
/// Construct via [`BalancedForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `train_fraction`  | 0.8     |
/// | `reference_class` | `Scam`  |
/// | `seed`            | 42      |
#[derive(Debug, Clone)]
pub struct BalancedForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) train_fraction: f64,
    pub(crate) reference_class: ReferenceClass,
    pub(crate) seed: u64,
}

impl BalancedForestConfig {
    /// Create a new config that trains `n_estimators` learners.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidEstimatorCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, BrfError> {
        if n_estimators == 0 {
            return Err(BrfError::InvalidEstimatorCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            train_fraction: 0.8,
            reference_class: ReferenceClass::Scam,
            seed: 42,
        })
    }

    /// Set the fraction of the reference pool kept for training.
    #[must_use]
    pub fn with_train_fraction(mut self, train_fraction: f64) -> Self {
        self.train_fraction = train_fraction;
        self
    }

    /// Set which pool sizes the test split and the bootstrap draws.
    #[must_use]
    pub fn with_reference_class(mut self, reference_class: ReferenceClass) -> Self {
        self.reference_class = reference_class;
        self
    }

    /// Set the seed for the split and every bootstrap draw.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of learners to train.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the training fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Return the reference-class policy.
    #[must_use]
    pub fn reference_class(&self) -> ReferenceClass {
        self.reference_class
    }

    /// Return the sampling seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Build the sampler this config describes.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidTrainFraction`] if `train_fraction` is not in (0.0, 1.0].
    pub fn sampler(&self) -> Result<BalancedSampler, BrfError> {
        Ok(BalancedSampler::new(self.train_fraction)?.with_reference_class(self.reference_class))
    }

    /// Split the pools, then train one learner per balanced bootstrap draw.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                              |
    /// |------------------------------------|---------------------------------------------------|
    /// | [`BrfError::InvalidTrainFraction`] | `train_fraction` is not in (0.0, 1.0]             |
    /// | [`BrfError::PoolDimensionMismatch`]| the pools have different row widths               |
    /// | [`BrfError::InsufficientData`]     | a pool is smaller than the test split, or a remainder is empty |
    /// | any learner error                  | a single fit failed; no partial forest is returned |
    pub fn fit<F: LearnerFactory>(
        &self,
        factory: &F,
        legit: &LabeledPool,
        scam: &LabeledPool,
    ) -> Result<TrainingResult<F::Learner>, BrfError> {
        crate::forest::train(self, factory, legit, scam)
    }
}
