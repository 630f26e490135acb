//! Class-balanced test split and bootstrap resampling.
//!
//! Legitimate listings vastly outnumber scams. The sampler holds out an
//! equal-sized test slice from each pool, then draws training sets with the
//! same number of rows from each class so no learner ever sees the raw
//! imbalance.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

use crate::error::BrfError;
use crate::pool::{Class, LabeledPool, TaggedSet};

/// Slack added before flooring the test-set size so that products like
/// `(1.0 - 0.8) * 20.0 = 3.9999999999999996` land on 4.
const SIZE_EPSILON: f64 = 1e-9;

/// Which pool sizes the held-out test slice and the per-class bootstrap draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceClass {
    /// Size from the scam pool, assumed to be the minority class.
    #[default]
    Scam,
    /// Size from the legit pool.
    Legit,
    /// Size from whichever pool is smaller.
    Smaller,
}

impl ReferenceClass {
    /// Pick the reference count from a `(legit, scam)` pair of sizes.
    #[must_use]
    pub fn resolve(self, n_legit: usize, n_scam: usize) -> usize {
        match self {
            ReferenceClass::Scam => n_scam,
            ReferenceClass::Legit => n_legit,
            ReferenceClass::Smaller => n_legit.min(n_scam),
        }
    }
}

/// A held-out test set plus the per-class rows left for training.
///
/// The test set and the remainders never share a row.
#[derive(Debug, Clone)]
pub struct PoolSplit {
    test_set: TaggedSet,
    remainder_legit: Vec<Vec<f64>>,
    remainder_scam: Vec<Vec<f64>>,
}

impl PoolSplit {
    /// Return the balanced, shuffled test set.
    #[must_use]
    pub fn test_set(&self) -> &TaggedSet {
        &self.test_set
    }

    /// Return the legit rows available for training.
    #[must_use]
    pub fn remainder_legit(&self) -> &[Vec<f64>] {
        &self.remainder_legit
    }

    /// Return the scam rows available for training.
    #[must_use]
    pub fn remainder_scam(&self) -> &[Vec<f64>] {
        &self.remainder_scam
    }

    /// Consume the split and return the test set.
    #[must_use]
    pub fn into_test_set(self) -> TaggedSet {
        self.test_set
    }
}

/// Produces balanced test splits and bootstrap training samples.
///
/// Construct via [`BalancedSampler::new`], then chain `with_reference_class`.
#[derive(Debug, Clone, Copy)]
pub struct BalancedSampler {
    train_fraction: f64,
    reference: ReferenceClass,
}

impl BalancedSampler {
    /// Create a sampler that keeps `train_fraction` of the reference pool for training.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidTrainFraction`] unless `train_fraction` is in (0.0, 1.0].
    pub fn new(train_fraction: f64) -> Result<Self, BrfError> {
        if !(train_fraction > 0.0 && train_fraction <= 1.0) {
            return Err(BrfError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }
        Ok(Self {
            train_fraction,
            reference: ReferenceClass::Scam,
        })
    }

    /// Set which pool sizes the split and the draws.
    #[must_use]
    pub fn with_reference_class(mut self, reference: ReferenceClass) -> Self {
        self.reference = reference;
        self
    }

    /// Return the training fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Return the reference-class policy.
    #[must_use]
    pub fn reference_class(&self) -> ReferenceClass {
        self.reference
    }

    /// Number of rows held out from each pool: `floor((1 - train_fraction) * n_reference)`.
    #[must_use]
    pub fn test_size(&self, n_legit: usize, n_scam: usize) -> usize {
        let n_reference = self.reference.resolve(n_legit, n_scam) as f64;
        ((1.0 - self.train_fraction) * n_reference + SIZE_EPSILON).floor() as usize
    }

    /// Hold out an equal-sized test slice from each pool.
    ///
    /// Each pool is shuffled, its last `test_size` rows go to the test set and
    /// the rest become that class's training remainder. The test set is
    /// shuffled before it is returned.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::PoolDimensionMismatch`] | pools have different row widths |
    /// | [`BrfError::InsufficientData`] | a pool has fewer rows than the test size |
    #[instrument(skip_all, fields(n_legit = legit.len(), n_scam = scam.len()))]
    pub fn split(
        &self,
        legit: &LabeledPool,
        scam: &LabeledPool,
        rng: &mut impl Rng,
    ) -> Result<PoolSplit, BrfError> {
        if legit.n_features() != scam.n_features() {
            return Err(BrfError::PoolDimensionMismatch {
                legit: legit.n_features(),
                scam: scam.n_features(),
            });
        }

        let test_size = self.test_size(legit.len(), scam.len());
        for pool in [legit, scam] {
            if pool.len() < test_size {
                return Err(BrfError::InsufficientData {
                    class: pool.class(),
                    available: pool.len(),
                    required: test_size,
                });
            }
        }

        let (remainder_legit, test_legit) = shuffled_tail_split(legit.rows(), test_size, rng);
        let (remainder_scam, test_scam) = shuffled_tail_split(scam.rows(), test_size, rng);

        let mut test_set = TaggedSet::tagged(test_legit, Class::Legit);
        test_set.extend(TaggedSet::tagged(test_scam, Class::Scam));
        test_set.shuffle(rng);

        debug!(
            test_size,
            remainder_legit = remainder_legit.len(),
            remainder_scam = remainder_scam.len(),
            "pools split"
        );

        Ok(PoolSplit {
            test_set,
            remainder_legit,
            remainder_scam,
        })
    }

    /// Number of rows each class contributes to one bootstrap draw.
    #[must_use]
    pub fn draw_count(&self, remainder_legit: usize, remainder_scam: usize) -> usize {
        self.reference.resolve(remainder_legit, remainder_scam)
    }

    /// Draw one balanced bootstrap training sample from a split's remainders.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InsufficientData`] if either remainder is empty.
    pub fn draw(&self, split: &PoolSplit, rng: &mut impl Rng) -> Result<TaggedSet, BrfError> {
        self.draw_bootstrap(&split.remainder_legit, &split.remainder_scam, rng)
    }

    /// Draw one balanced bootstrap training sample.
    ///
    /// Each remainder is shuffled, then `draw_count` rows are picked with
    /// replacement from its first `min(draw_count, len)` rows. Both classes
    /// contribute exactly `draw_count` rows and the combined set is shuffled.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InsufficientData`] if either remainder is empty.
    pub fn draw_bootstrap(
        &self,
        remainder_legit: &[Vec<f64>],
        remainder_scam: &[Vec<f64>],
        rng: &mut impl Rng,
    ) -> Result<TaggedSet, BrfError> {
        for (class, rows) in [(Class::Legit, remainder_legit), (Class::Scam, remainder_scam)] {
            if rows.is_empty() {
                return Err(BrfError::InsufficientData {
                    class,
                    available: 0,
                    required: 1,
                });
            }
        }

        let draw_count = self.draw_count(remainder_legit.len(), remainder_scam.len());

        let boot_legit = resample(remainder_legit, draw_count, rng);
        let boot_scam = resample(remainder_scam, draw_count, rng);

        let mut sample = TaggedSet::tagged(boot_scam, Class::Scam);
        sample.extend(TaggedSet::tagged(boot_legit, Class::Legit));
        sample.shuffle(rng);
        Ok(sample)
    }
}

/// Shuffle `rows` and cut off the last `tail` rows.
///
/// Returns `(head, tail)`.
fn shuffled_tail_split(
    rows: &[Vec<f64>],
    tail: usize,
    rng: &mut impl Rng,
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut shuffled = rows.to_vec();
    shuffled.shuffle(rng);
    let tail_rows = shuffled.split_off(shuffled.len() - tail);
    (shuffled, tail_rows)
}

/// Shuffle `rows`, then draw `count` rows with replacement from the first
/// `min(count, rows.len())` of them.
fn resample(rows: &[Vec<f64>], count: usize, rng: &mut impl Rng) -> Vec<Vec<f64>> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.shuffle(rng);
    let window = count.min(rows.len());
    (0..count)
        .map(|_| rows[order[rng.gen_range(0..window)]].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn pool(class: Class, n: usize, dim: usize, offset: f64) -> LabeledPool {
        let rows = (0..n)
            .map(|i| (0..dim).map(|d| offset + i as f64 + d as f64 * 0.01).collect())
            .collect();
        LabeledPool::new(class, rows).unwrap()
    }

    #[test]
    fn hundred_to_twenty_split_sizes() {
        let legit = pool(Class::Legit, 100, 3, 0.0);
        let scam = pool(Class::Scam, 20, 3, 1000.0);
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = sampler.split(&legit, &scam, &mut rng).unwrap();
        assert_eq!(split.test_set().len(), 8);
        assert_eq!(split.test_set().class_counts(), (4, 4));
        assert_eq!(split.remainder_legit().len(), 96);
        assert_eq!(split.remainder_scam().len(), 16);

        let sample = sampler.draw(&split, &mut rng).unwrap();
        assert_eq!(sample.len(), 32);
        assert_eq!(sample.class_counts(), (16, 16));
    }

    #[test]
    fn test_set_disjoint_from_remainders() {
        let legit = pool(Class::Legit, 50, 2, 0.0);
        let scam = pool(Class::Scam, 10, 2, 1000.0);
        let sampler = BalancedSampler::new(0.7).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let split = sampler.split(&legit, &scam, &mut rng).unwrap();

        for row in split.test_set().features() {
            assert!(!split.remainder_legit().contains(row));
            assert!(!split.remainder_scam().contains(row));
        }
        assert_eq!(split.remainder_legit().len() + 3, 50);
        assert_eq!(split.remainder_scam().len() + 3, 10);
    }

    #[test]
    fn every_draw_is_balanced() {
        let legit = pool(Class::Legit, 37, 4, 0.0);
        let scam = pool(Class::Scam, 11, 4, 1000.0);
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let split = sampler.split(&legit, &scam, &mut rng).unwrap();
        let n_ref = split.remainder_scam().len();

        for _ in 0..50 {
            let sample = sampler.draw(&split, &mut rng).unwrap();
            assert_eq!(sample.class_counts(), (n_ref, n_ref));
            assert_eq!(sample.len(), 2 * n_ref);
        }
    }

    #[test]
    fn draws_only_come_from_remainders() {
        let legit = pool(Class::Legit, 30, 1, 0.0);
        let scam = pool(Class::Scam, 10, 1, 1000.0);
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let split = sampler.split(&legit, &scam, &mut rng).unwrap();
        let sample = sampler.draw(&split, &mut rng).unwrap();

        for (row, &label) in sample.features().iter().zip(sample.labels()) {
            let source = if label == 1 {
                split.remainder_scam()
            } else {
                split.remainder_legit()
            };
            assert!(source.contains(row));
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let legit = pool(Class::Legit, 40, 2, 0.0);
        let scam = pool(Class::Scam, 12, 2, 1000.0);
        let sampler = BalancedSampler::new(0.75).unwrap();

        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let split = sampler.split(&legit, &scam, &mut rng).unwrap();
            let a = sampler.draw(&split, &mut rng).unwrap();
            let b = sampler.draw(&split, &mut rng).unwrap();
            (split.into_test_set(), a, b)
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn smaller_reference_uses_minority_remainder() {
        let legit = pool(Class::Legit, 10, 2, 0.0);
        let scam = pool(Class::Scam, 40, 2, 1000.0);
        let sampler = BalancedSampler::new(0.8)
            .unwrap()
            .with_reference_class(ReferenceClass::Smaller);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let split = sampler.split(&legit, &scam, &mut rng).unwrap();
        assert_eq!(split.test_set().class_counts(), (2, 2));

        let sample = sampler.draw(&split, &mut rng).unwrap();
        assert_eq!(sample.class_counts(), (8, 8));
    }

    #[test]
    fn legit_reference_can_oversample_the_smaller_pool() {
        let sampler = BalancedSampler::new(1.0)
            .unwrap()
            .with_reference_class(ReferenceClass::Legit);
        let legit = vec![vec![0.0]; 12];
        let scam = vec![vec![1.0]; 3];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let sample = sampler.draw_bootstrap(&legit, &scam, &mut rng).unwrap();
        assert_eq!(sample.class_counts(), (12, 12));
    }

    #[test]
    fn legit_pool_smaller_than_test_size_fails() {
        let legit = pool(Class::Legit, 3, 2, 0.0);
        let scam = pool(Class::Scam, 20, 2, 1000.0);
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sampler.split(&legit, &scam, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            BrfError::InsufficientData { class: Class::Legit, available: 3, required: 4 }
        ));
    }

    #[test]
    fn empty_remainder_fails() {
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sampler
            .draw_bootstrap(&[vec![1.0]], &[], &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            BrfError::InsufficientData { class: Class::Scam, available: 0, .. }
        ));
    }

    #[test]
    fn dimension_mismatch_fails() {
        let legit = pool(Class::Legit, 10, 3, 0.0);
        let scam = pool(Class::Scam, 10, 2, 0.0);
        let sampler = BalancedSampler::new(0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sampler.split(&legit, &scam, &mut rng).unwrap_err();
        assert!(matches!(err, BrfError::PoolDimensionMismatch { legit: 3, scam: 2 }));
    }

    #[test]
    fn invalid_train_fraction() {
        assert!(BalancedSampler::new(0.0).is_err());
        assert!(BalancedSampler::new(1.2).is_err());
        assert!(BalancedSampler::new(f64::NAN).is_err());
        assert!(BalancedSampler::new(1.0).is_ok());
    }

    #[test]
    fn test_size_floors() {
        let sampler = BalancedSampler::new(0.8).unwrap();
        assert_eq!(sampler.test_size(100, 20), 4);
        assert_eq!(sampler.test_size(100, 24), 4);
        assert_eq!(sampler.test_size(100, 4), 0);
    }
}
