//! Balanced bootstrap forests for scam detection: sample, train, predict, evaluate.
//!
//! A [`BalancedSampler`] withholds an equal-sized test set from a large legit
//! pool and a small scam pool, then draws balanced bootstrap samples from what
//! remains. [`BalancedForestConfig::fit`] trains one [`BaseLearner`] per draw in
//! parallel; the resulting [`BalancedForest`] averages learner scores, and
//! [`ScoredSet`] turns those scores into confusion matrices and curves.
//! Models round-trip through a versioned bincode envelope.

mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod learner;
mod node;
mod pool;
mod predict;
mod result;
mod sampler;
mod serialize;
mod split;
mod tree;
mod validation;

pub use config::BalancedForestConfig;
pub use confusion::{ConfusionMatrix, Rates};
pub use error::{BrfError, ErrorKind};
pub use eval::{Curve, CurveKind, CurvePoint, ErrorRates, ScoredSet, ThresholdChoice, default_thresholds};
pub use forest::BalancedForest;
pub use learner::{BaseLearner, LearnerFactory, TreeLearner, TreeLearnerFactory, TreeScoring};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use pool::{Class, LabeledPool, TaggedSet};
pub use predict::classify_scores;
pub use result::{TrainingMetadata, TrainingResult};
pub use sampler::{BalancedSampler, PoolSplit, ReferenceClass};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig, MaxFeatures};
pub use validation::{PartitionReport, PartitionedValidation, ValidationReport};
