//! Partitioned validation: independent forests on disjoint slices of the pools.
//!
//! Both pools are cut into `k` contiguous partitions; the last partition
//! takes the remainder. Partition `i` of the legit pool is paired with
//! partition `i` of the scam pool, and each pair trains and evaluates its
//! own balanced forest on its own withheld test set.

use std::ops::Range;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::config::BalancedForestConfig;
use crate::confusion::{ConfusionMatrix, Rates};
use crate::error::BrfError;
use crate::learner::LearnerFactory;
use crate::pool::LabeledPool;

/// Configuration for partitioned validation.
#[derive(Debug, Clone)]
pub struct PartitionedValidation {
    n_partitions: usize,
    threshold: f64,
}

/// Evaluation of one partition's forest on its withheld test set.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PartitionReport {
    /// Zero-based partition index.
    pub partition: usize,
    /// Legit rows in the partition.
    pub n_legit: usize,
    /// Scam rows in the partition.
    pub n_scam: usize,
    /// Seed the partition's forest was trained with.
    pub seed: u64,
    /// Confusion matrix on the partition's test set.
    pub confusion: ConfusionMatrix,
    /// Precision, recall, and false-positive rate.
    pub rates: Rates,
    /// F1 score; `None` when undefined.
    pub f1: Option<f64>,
}

/// Reports for every partition plus their mean F1.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationReport {
    /// Classification threshold used for every partition.
    pub threshold: f64,
    /// One report per partition, in partition order.
    pub partitions: Vec<PartitionReport>,
    /// Mean of the defined per-partition F1 scores.
    pub mean_f1: Option<f64>,
}

/// Row ranges of `k` contiguous partitions over `n` rows.
fn partition_ranges(n: usize, k: usize) -> Vec<Range<usize>> {
    let step = n / k;
    (0..k)
        .map(|i| {
            let end = if i + 1 == k { n } else { (i + 1) * step };
            i * step..end
        })
        .collect()
}

fn slice_pool(pool: &LabeledPool, range: Range<usize>) -> Result<LabeledPool, BrfError> {
    LabeledPool::new(pool.class(), pool.rows()[range].to_vec())
}

impl PartitionedValidation {
    /// Create a validation over `n_partitions` partitions, thresholded at 0.5.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidPartitionCount`] if `n_partitions < 2`.
    pub fn new(n_partitions: usize) -> Result<Self, BrfError> {
        if n_partitions < 2 {
            return Err(BrfError::InvalidPartitionCount { n_partitions });
        }
        Ok(Self {
            n_partitions,
            threshold: 0.5,
        })
    }

    /// Set the classification threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Return the number of partitions.
    #[must_use]
    pub fn n_partitions(&self) -> usize {
        self.n_partitions
    }

    /// Return the classification threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Train and evaluate one forest per partition.
    ///
    /// Each partition's forest uses `config` with its own seed, drawn from a
    /// generator seeded with `config.seed()`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::InsufficientData`] | a pool has fewer rows than partitions, or a partition is too small to split |
    /// | training errors | see [`BalancedForestConfig::fit`] |
    #[instrument(skip_all, fields(n_partitions = self.n_partitions))]
    pub fn evaluate<F: LearnerFactory>(
        &self,
        config: &BalancedForestConfig,
        factory: &F,
        legit: &LabeledPool,
        scam: &LabeledPool,
    ) -> Result<ValidationReport, BrfError> {
        for pool in [legit, scam] {
            if pool.len() < self.n_partitions {
                return Err(BrfError::InsufficientData {
                    class: pool.class(),
                    available: pool.len(),
                    required: self.n_partitions,
                });
            }
        }

        let legit_ranges = partition_ranges(legit.len(), self.n_partitions);
        let scam_ranges = partition_ranges(scam.len(), self.n_partitions);
        let mut seed_rng = ChaCha8Rng::seed_from_u64(config.seed());

        let mut partitions = Vec::with_capacity(self.n_partitions);
        for (partition, (legit_range, scam_range)) in legit_ranges.into_iter().zip(scam_ranges).enumerate() {
            let seed: u64 = seed_rng.r#gen();
            let legit_part = slice_pool(legit, legit_range)?;
            let scam_part = slice_pool(scam, scam_range)?;

            let result = config
                .clone()
                .with_seed(seed)
                .fit(factory, &legit_part, &scam_part)?;
            let test_set = result.test_set();
            let confusion = result
                .forest()
                .confusion_matrix(test_set.features(), test_set.labels(), self.threshold)?;

            info!(
                partition,
                n_legit = legit_part.len(),
                n_scam = scam_part.len(),
                f1 = confusion.f1(),
                "partition evaluated"
            );

            partitions.push(PartitionReport {
                partition,
                n_legit: legit_part.len(),
                n_scam: scam_part.len(),
                seed,
                confusion,
                rates: confusion.rates(),
                f1: confusion.f1(),
            });
        }

        let defined: Vec<f64> = partitions.iter().filter_map(|p| p.f1).collect();
        let mean_f1 = (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64);

        Ok(ValidationReport {
            threshold: self.threshold,
            partitions,
            mean_f1,
        })
    }
}
