//! Prediction methods for the balanced forest.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::BrfError;
use crate::forest::{BalancedForest, check_trained};
use crate::learner::BaseLearner;

/// Classify pre-computed scores: 1 (scam) iff `score >= threshold`.
#[must_use]
pub fn classify_scores(scores: &[f64], threshold: f64) -> Vec<usize> {
    scores.iter().map(|&s| usize::from(s >= threshold)).collect()
}

impl<L: BaseLearner> BalancedForest<L> {
    /// Return the mean learner score for each row.
    ///
    /// Learners score in parallel; the sum runs in learner order, so the
    /// result does not depend on scheduling. Identical learners yield their
    /// shared score bit for bit.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::UntrainedModel`] | the forest holds no learners |
    /// | [`BrfError::PredictionFeatureMismatch`] | a row's width differs from `n_features` |
    /// | [`BrfError::ScoreCountMismatch`] | a learner returned the wrong number of scores |
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, BrfError> {
        check_trained(self)?;
        for row in features {
            if row.len() != self.n_features {
                return Err(BrfError::PredictionFeatureMismatch {
                    expected: self.n_features,
                    got: row.len(),
                });
            }
        }

        let per_learner: Vec<Vec<f64>> = self
            .learners
            .par_iter()
            .map(|learner| {
                let scores = learner.score(features)?;
                if scores.len() != features.len() {
                    return Err(BrfError::ScoreCountMismatch {
                        expected: features.len(),
                        got: scores.len(),
                    });
                }
                Ok(scores)
            })
            .collect::<Result<_, BrfError>>()?;

        // Mean as an offset from the first learner's score, so learners that
        // agree on a row reproduce that score exactly.
        let (first, rest) = per_learner.split_first().ok_or(BrfError::UntrainedModel)?;
        let mut offsets = vec![0.0f64; features.len()];
        for scores in rest {
            for ((offset, score), base) in offsets.iter_mut().zip(scores).zip(first) {
                *offset += score - base;
            }
        }
        let n = self.learners.len() as f64;
        Ok(first
            .iter()
            .zip(offsets)
            .map(|(base, offset)| base + offset / n)
            .collect())
    }

    /// Classify each row as scam (1) iff its mean score is `>= threshold`.
    ///
    /// # Errors
    ///
    /// Same as [`BalancedForest::predict`].
    pub fn classify(&self, features: &[Vec<f64>], threshold: f64) -> Result<Vec<usize>, BrfError> {
        Ok(classify_scores(&self.predict(features)?, threshold))
    }
}
