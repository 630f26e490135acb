//! Binary confusion matrix and the rates derived from it.
//!
//! Scam (label 1) is the positive class throughout. Rates whose
//! denominator is zero are `None` rather than NaN.

use std::fmt;

use crate::error::BrfError;
use crate::pool::Class;

/// Counts of the four outcomes of a binary classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ConfusionMatrix {
    true_negative: usize,
    false_negative: usize,
    false_positive: usize,
    true_positive: usize,
}

/// Precision, recall, and false-positive rate at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Rates {
    /// TP / (TP + FP); `None` when nothing was classified scam.
    pub precision: Option<f64>,
    /// TP / (TP + FN); `None` when there are no true scams.
    pub recall: Option<f64>,
    /// FP / (FP + TN); `None` when there are no true legits.
    pub false_positive_rate: Option<f64>,
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

impl ConfusionMatrix {
    /// Build a matrix from raw counts.
    #[must_use]
    pub fn from_counts(true_negative: usize, false_negative: usize, false_positive: usize, true_positive: usize) -> Self {
        Self {
            true_negative,
            false_negative,
            false_positive,
            true_positive,
        }
    }

    /// Build a confusion matrix from true and predicted 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::LabelCountMismatch`] | the slices differ in length |
    /// | [`BrfError::InvalidLabel`] | a label in either slice is not 0 or 1 |
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, BrfError> {
        if true_labels.len() != predicted.len() {
            return Err(BrfError::LabelCountMismatch {
                n_rows: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = Self::default();
        for (row_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            let truth = Class::from_label(t, row_index)?;
            let guess = Class::from_label(p, row_index)?;
            matrix.record(truth, guess);
        }
        Ok(matrix)
    }

    pub(crate) fn record(&mut self, truth: Class, guess: Class) {
        match (truth, guess) {
            (Class::Legit, Class::Legit) => self.true_negative += 1,
            (Class::Scam, Class::Legit) => self.false_negative += 1,
            (Class::Legit, Class::Scam) => self.false_positive += 1,
            (Class::Scam, Class::Scam) => self.true_positive += 1,
        }
    }

    /// Legit rows classified legit.
    #[must_use]
    pub fn true_negative(&self) -> usize {
        self.true_negative
    }

    /// Scam rows classified legit.
    #[must_use]
    pub fn false_negative(&self) -> usize {
        self.false_negative
    }

    /// Legit rows classified scam.
    #[must_use]
    pub fn false_positive(&self) -> usize {
        self.false_positive
    }

    /// Scam rows classified scam.
    #[must_use]
    pub fn true_positive(&self) -> usize {
        self.true_positive
    }

    /// Total rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_negative + self.false_negative + self.false_positive + self.true_positive
    }

    /// Rows classified scam (TP + FP).
    #[must_use]
    pub fn predicted_positive(&self) -> usize {
        self.true_positive + self.false_positive
    }

    /// Proportion of correct classifications; `None` for an empty matrix.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    /// TP / (TP + FP).
    #[must_use]
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// TP / (TP + FN).
    #[must_use]
    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// FP / (FP + TN).
    #[must_use]
    pub fn false_positive_rate(&self) -> Option<f64> {
        ratio(self.false_positive, self.false_positive + self.true_negative)
    }

    /// Harmonic mean of precision and recall.
    ///
    /// `None` when either is undefined or both are zero.
    #[must_use]
    pub fn f1(&self) -> Option<f64> {
        let precision = self.precision()?;
        let recall = self.recall()?;
        let sum = precision + recall;
        (sum > 0.0).then(|| 2.0 * precision * recall / sum)
    }

    /// Precision, recall, and false-positive rate together.
    #[must_use]
    pub fn rates(&self) -> Rates {
        Rates {
            precision: self.precision(),
            recall: self.recall(),
            false_positive_rate: self.false_positive_rate(),
        }
    }

    /// Rows indexed by predicted class, columns by true class:
    /// `[[TN, FN], [FP, TP]]`.
    #[must_use]
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_negative],
            [self.false_positive, self.true_positive],
        ]
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12}{:>8}{:>8}", "", "legit", "scam")?;
        writeln!(f, "{:>12}{:>8}{:>8}", "pred legit", self.true_negative, self.false_negative)?;
        write!(f, "{:>12}{:>8}{:>8}", "pred scam", self.false_positive, self.true_positive)
    }
}
