//! Labeled pools and tagged record sets.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::BrfError;

/// The two listing classes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    /// A legitimate rental listing (label 0).
    Legit,
    /// A fraudulent rental listing (label 1).
    Scam,
}

impl Class {
    /// Return the numeric label: 0 for legit, 1 for scam.
    #[must_use]
    pub fn label(self) -> usize {
        match self {
            Class::Legit => 0,
            Class::Scam => 1,
        }
    }

    /// Map a numeric label back to a class.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidLabel`] for anything other than 0 or 1.
    pub fn from_label(label: usize, row_index: usize) -> Result<Self, BrfError> {
        match label {
            0 => Ok(Class::Legit),
            1 => Ok(Class::Scam),
            _ => Err(BrfError::InvalidLabel { row_index, label }),
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Legit => f.write_str("legit"),
            Class::Scam => f.write_str("scam"),
        }
    }
}

/// Check a row-major matrix for emptiness, ragged rows, and non-finite values.
///
/// Returns the common row width.
pub(crate) fn validate_matrix(features: &[Vec<f64>]) -> Result<usize, BrfError> {
    let first = features.first().ok_or(BrfError::EmptyDataset)?;
    let n_features = first.len();
    if n_features == 0 {
        return Err(BrfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(BrfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(BrfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }
    Ok(n_features)
}

/// Check that `labels` pairs one-to-one with `n_rows` and holds only 0/1.
pub(crate) fn validate_labels(n_rows: usize, labels: &[usize]) -> Result<(), BrfError> {
    if labels.len() != n_rows {
        return Err(BrfError::LabelCountMismatch {
            n_rows,
            n_labels: labels.len(),
        });
    }
    for (row_index, &label) in labels.iter().enumerate() {
        Class::from_label(label, row_index)?;
    }
    Ok(())
}

/// Feature vectors that all belong to one class.
///
/// Every row has the same width; the width is fixed at construction.
#[derive(Debug, Clone)]
pub struct LabeledPool {
    class: Class,
    rows: Vec<Vec<f64>>,
    n_features: usize,
}

impl LabeledPool {
    /// Build a pool from row-major feature vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::EmptyPool`] | `rows` is empty |
    /// | [`BrfError::ZeroFeatures`] | rows have zero columns |
    /// | [`BrfError::FeatureCountMismatch`] | rows have inconsistent widths |
    /// | [`BrfError::NonFiniteValue`] | any value is NaN or infinite |
    pub fn new(class: Class, rows: Vec<Vec<f64>>) -> Result<Self, BrfError> {
        if rows.is_empty() {
            return Err(BrfError::EmptyPool { class });
        }
        let n_features = validate_matrix(&rows)?;
        Ok(Self {
            class,
            rows,
            n_features,
        })
    }

    /// Return the class every row belongs to.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the pool has no rows. Never true for a constructed pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return the row width.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Feature rows paired with 0/1 labels.
///
/// `features[i]` is labeled `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedSet {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl TaggedSet {
    /// Pair feature rows with labels.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::LabelCountMismatch`] when the lengths differ and
    /// [`BrfError::InvalidLabel`] for any label other than 0 or 1.
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self, BrfError> {
        validate_labels(features.len(), &labels)?;
        Ok(Self { features, labels })
    }

    /// Tag every row with the same class.
    pub(crate) fn tagged(rows: Vec<Vec<f64>>, class: Class) -> Self {
        let labels = vec![class.label(); rows.len()];
        Self {
            features: rows,
            labels,
        }
    }

    /// Append another set's rows after this one's.
    pub(crate) fn extend(&mut self, other: TaggedSet) {
        self.features.extend(other.features);
        self.labels.extend(other.labels);
    }

    /// Shuffle rows and labels together.
    pub(crate) fn shuffle(&mut self, rng: &mut impl Rng) {
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        order.shuffle(rng);
        self.features = order.iter().map(|&i| self.features[i].clone()).collect();
        self.labels = order.iter().map(|&i| self.labels[i]).collect();
    }

    /// Return the feature rows.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` if the set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count rows per class as `(legit, scam)`.
    #[must_use]
    pub fn class_counts(&self) -> (usize, usize) {
        let scam = self.labels.iter().filter(|&&l| l == Class::Scam.label()).count();
        (self.labels.len() - scam, scam)
    }

    /// Split into `(features, labels)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<usize>) {
        (self.features, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn class_labels() {
        assert_eq!(Class::Legit.label(), 0);
        assert_eq!(Class::Scam.label(), 1);
        assert_eq!(Class::from_label(1, 0).unwrap(), Class::Scam);
        assert!(matches!(
            Class::from_label(2, 7),
            Err(BrfError::InvalidLabel { row_index: 7, label: 2 })
        ));
    }

    #[test]
    fn empty_pool_rejected() {
        let err = LabeledPool::new(Class::Scam, vec![]).unwrap_err();
        assert!(matches!(err, BrfError::EmptyPool { class: Class::Scam }));
    }

    #[test]
    fn ragged_pool_rejected() {
        let err = LabeledPool::new(Class::Legit, vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            BrfError::FeatureCountMismatch { expected: 2, got: 1, sample_index: 1 }
        ));
    }

    #[test]
    fn non_finite_pool_rejected() {
        let err = LabeledPool::new(Class::Legit, vec![vec![1.0, f64::INFINITY]]).unwrap_err();
        assert!(matches!(err, BrfError::NonFiniteValue { .. }));
    }

    #[test]
    fn pool_reports_width() {
        let pool = LabeledPool::new(Class::Legit, vec![vec![0.0; 7]; 3]).unwrap();
        assert_eq!(pool.n_features(), 7);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.class(), Class::Legit);
    }

    #[test]
    fn tagged_set_rejects_bad_labels() {
        let err = TaggedSet::new(vec![vec![1.0], vec![2.0]], vec![0, 3]).unwrap_err();
        assert!(matches!(err, BrfError::InvalidLabel { row_index: 1, label: 3 }));

        let err = TaggedSet::new(vec![vec![1.0]], vec![0, 1]).unwrap_err();
        assert!(matches!(err, BrfError::LabelCountMismatch { n_rows: 1, n_labels: 2 }));
    }

    #[test]
    fn shuffle_keeps_rows_paired_with_labels() {
        let mut set = TaggedSet::tagged(vec![vec![0.0]; 5], Class::Legit);
        set.extend(TaggedSet::tagged(vec![vec![1.0]; 5], Class::Scam));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        set.shuffle(&mut rng);

        assert_eq!(set.class_counts(), (5, 5));
        for (row, &label) in set.features().iter().zip(set.labels()) {
            assert_eq!(row[0] as usize, label);
        }
    }
}
