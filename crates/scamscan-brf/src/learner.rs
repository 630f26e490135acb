//! The base-learner seam between the ensemble and any binary classifier.
//!
//! The ensemble only ever calls [`BaseLearner::fit`] once per learner and
//! then [`BaseLearner::score`]; how a learner partitions feature space is
//! its own business. [`TreeLearner`] is the CART implementation.

use crate::error::BrfError;
use crate::pool::Class;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A binary classifier the ensemble can train and query.
pub trait BaseLearner: Send + Sync {
    /// Train in place on row-major `features` and 0/1 `labels`.
    ///
    /// # Errors
    ///
    /// Implementations return a [`BrfError`] describing invalid input.
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) -> Result<(), BrfError>;

    /// Score each row; higher means more likely a scam.
    ///
    /// Must return exactly one score per input row. Scores need not be
    /// calibrated probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::UntrainedModel`] before `fit`, or a shape error
    /// for rows of the wrong width.
    fn score(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, BrfError>;

    /// Check that a deserialized learner is safe to score `n_features`-wide rows.
    ///
    /// Called on every learner when a model is loaded. Returns a description
    /// of the first inconsistency found.
    ///
    /// # Errors
    ///
    /// Returns the reason the learner's state cannot be trusted.
    fn check_integrity(&self, n_features: usize) -> Result<(), String> {
        let _ = n_features;
        Ok(())
    }
}

/// Mints fresh, untrained learners for the trainer.
///
/// The trainer calls [`LearnerFactory::create`] once per bootstrap cycle
/// with an independent seed, so no learner is ever reused.
pub trait LearnerFactory: Sync {
    /// The learner type produced.
    type Learner: BaseLearner;

    /// Create an untrained learner seeded with `seed`.
    fn create(&self, seed: u64) -> Self::Learner;
}

/// How a [`TreeLearner`] turns a leaf into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TreeScoring {
    /// The leaf's majority class as 0.0 or 1.0; the ensemble mean is then
    /// the fraction of trees voting scam.
    #[default]
    Vote,
    /// The fraction of scam training samples in the leaf.
    Probability,
}

/// A CART decision tree behind the [`BaseLearner`] contract.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TreeLearner {
    config: DecisionTreeConfig,
    scoring: TreeScoring,
    pub(crate) tree: Option<DecisionTree>,
}

impl TreeLearner {
    /// Create an untrained learner.
    #[must_use]
    pub fn new(config: DecisionTreeConfig, scoring: TreeScoring) -> Self {
        Self {
            config,
            scoring,
            tree: None,
        }
    }

    /// Return the fitted tree, if any.
    #[must_use]
    pub fn tree(&self) -> Option<&DecisionTree> {
        self.tree.as_ref()
    }

    /// Return the scoring mode.
    #[must_use]
    pub fn scoring(&self) -> TreeScoring {
        self.scoring
    }
}

impl BaseLearner for TreeLearner {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) -> Result<(), BrfError> {
        self.tree = Some(self.config.fit(features, labels)?);
        Ok(())
    }

    fn score(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, BrfError> {
        let tree = self.tree.as_ref().ok_or(BrfError::UntrainedModel)?;
        features
            .iter()
            .map(|row| match self.scoring {
                TreeScoring::Vote => tree
                    .predict(row)
                    .map(|class| if class == Class::Scam { 1.0 } else { 0.0 }),
                TreeScoring::Probability => tree.predict_scam_fraction(row),
            })
            .collect()
    }

    fn check_integrity(&self, n_features: usize) -> Result<(), String> {
        let tree = self.tree.as_ref().ok_or_else(|| "learner holds no fitted tree".to_string())?;
        tree.check_structure(n_features)
    }
}

/// Builds [`TreeLearner`]s that share one tree configuration.
#[derive(Debug, Clone, Default)]
pub struct TreeLearnerFactory {
    config: DecisionTreeConfig,
    scoring: TreeScoring,
}

impl TreeLearnerFactory {
    /// Create a factory; each learner gets `config` with its own seed.
    #[must_use]
    pub fn new(config: DecisionTreeConfig) -> Self {
        Self {
            config,
            scoring: TreeScoring::Vote,
        }
    }

    /// Set how the produced learners score rows.
    #[must_use]
    pub fn with_scoring(mut self, scoring: TreeScoring) -> Self {
        self.scoring = scoring;
        self
    }
}

impl LearnerFactory for TreeLearnerFactory {
    type Learner = TreeLearner;

    fn create(&self, seed: u64) -> TreeLearner {
        TreeLearner::new(self.config.clone().with_seed(seed), self.scoring)
    }
}
