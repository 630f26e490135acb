//! Training result types for the balanced forest.

use crate::forest::BalancedForest;
use crate::pool::TaggedSet;

/// Metadata about the training run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingMetadata {
    /// Number of learners trained.
    pub n_estimators: usize,
    /// Number of features per row.
    pub n_features: usize,
    /// Rows in the legit pool before splitting.
    pub n_legit: usize,
    /// Rows in the scam pool before splitting.
    pub n_scam: usize,
    /// Rows withheld per class for the test set.
    pub test_size_per_class: usize,
    /// Rows drawn per class for each bootstrap sample.
    pub draw_count: usize,
    /// Seed of the split and every bootstrap draw.
    pub seed: u64,
}

/// Result of balanced forest training.
///
/// Holds the fitted forest next to the balanced test set that was withheld
/// from every bootstrap draw, so evaluation needs no second pass over the pools.
#[derive(Debug, Clone)]
pub struct TrainingResult<L> {
    forest: BalancedForest<L>,
    test_set: TaggedSet,
    metadata: TrainingMetadata,
}

impl<L> TrainingResult<L> {
    pub(crate) fn new(forest: BalancedForest<L>, test_set: TaggedSet, metadata: TrainingMetadata) -> Self {
        Self {
            forest,
            test_set,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &BalancedForest<L> {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> BalancedForest<L> {
        self.forest
    }

    /// Borrow the withheld test set.
    #[must_use]
    pub fn test_set(&self) -> &TaggedSet {
        &self.test_set
    }

    /// Borrow the training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Split into forest, test set, and metadata.
    #[must_use]
    pub fn into_parts(self) -> (BalancedForest<L>, TaggedSet, TrainingMetadata) {
        (self.forest, self.test_set, self.metadata)
    }
}
