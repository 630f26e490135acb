//! Threshold-based evaluation over cached ensemble scores.
//!
//! A [`ScoredSet`] runs the forest once and then answers any number of
//! threshold queries: confusion matrices, PR and ROC curves, error rates,
//! and a best-F1 threshold search.

use tracing::instrument;

use crate::confusion::ConfusionMatrix;
use crate::error::BrfError;
use crate::forest::BalancedForest;
use crate::learner::BaseLearner;
use crate::pool::{Class, validate_labels};

/// Ensemble scores paired with true labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSet {
    scores: Vec<f64>,
    labels: Vec<usize>,
}

/// Which pair of rates a [`Curve`] plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// x = recall, y = precision.
    Pr,
    /// x = false-positive rate, y = recall.
    Roc,
}

/// One threshold's point on a curve. Undefined coordinates are `None`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CurvePoint {
    /// The threshold that produced this point.
    pub threshold: f64,
    /// Horizontal coordinate.
    pub x: Option<f64>,
    /// Vertical coordinate.
    pub y: Option<f64>,
}

/// Points of a PR or ROC curve, in the order the thresholds were given.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Curve {
    kind: CurveKind,
    points: Vec<CurvePoint>,
}

/// Misclassification rates, each normalized by the total row count.
///
/// The false-positive and false-negative rates here divide by N, not by
/// the class totals used in [`ConfusionMatrix::false_positive_rate`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ErrorRates {
    /// (FP + FN) / N.
    pub error: f64,
    /// FP / N.
    pub false_positive: f64,
    /// FN / N.
    pub false_negative: f64,
}

/// The winner of a best-F1 threshold search.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ThresholdChoice {
    /// The chosen threshold.
    pub threshold: f64,
    /// F1 at that threshold.
    pub f1: f64,
    /// Confusion matrix at that threshold.
    pub confusion: ConfusionMatrix,
}

/// The threshold grid 0.01, 0.02, ..., 0.99.
#[must_use]
pub fn default_thresholds() -> Vec<f64> {
    (1..100).map(|i| f64::from(i) / 100.0).collect()
}

/// Check that `thresholds` is strictly increasing or strictly decreasing.
fn check_strictly_ordered(thresholds: &[f64]) -> Result<(), BrfError> {
    let ascending = match thresholds {
        [first, second, ..] => first < second,
        _ => return Ok(()),
    };
    for (position, pair) in thresholds.windows(2).enumerate() {
        let ordered = if ascending { pair[0] < pair[1] } else { pair[0] > pair[1] };
        if !ordered {
            return Err(BrfError::UnorderedThresholds {
                position: position + 1,
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

impl ScoredSet {
    /// Pair scores with 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::EmptyEvaluationSet`] | no rows |
    /// | [`BrfError::LabelCountMismatch`] | `scores` and `labels` differ in length |
    /// | [`BrfError::InvalidLabel`] | a label is not 0 or 1 |
    pub fn new(scores: Vec<f64>, labels: Vec<usize>) -> Result<Self, BrfError> {
        if scores.is_empty() && labels.is_empty() {
            return Err(BrfError::EmptyEvaluationSet);
        }
        validate_labels(scores.len(), &labels)?;
        Ok(Self { scores, labels })
    }

    /// Return the cached scores.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Return the true labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Always false; construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Confusion matrix with rows classified scam iff `score >= threshold`.
    #[must_use]
    pub fn confusion_matrix(&self, threshold: f64) -> ConfusionMatrix {
        let mut matrix = ConfusionMatrix::default();
        for (&score, &label) in self.scores.iter().zip(&self.labels) {
            let truth = if label == 1 { Class::Scam } else { Class::Legit };
            let guess = if score >= threshold { Class::Scam } else { Class::Legit };
            matrix.record(truth, guess);
        }
        matrix
    }

    /// Error, false-positive, and false-negative rates over all N rows.
    #[must_use]
    pub fn error_rates(&self, threshold: f64) -> ErrorRates {
        let matrix = self.confusion_matrix(threshold);
        let n = matrix.total() as f64;
        ErrorRates {
            error: (matrix.false_positive() + matrix.false_negative()) as f64 / n,
            false_positive: matrix.false_positive() as f64 / n,
            false_negative: matrix.false_negative() as f64 / n,
        }
    }

    /// Sweep `thresholds` and return one curve point per threshold.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::UnorderedThresholds`] if `thresholds` is not
    /// strictly increasing or strictly decreasing.
    #[instrument(skip(self, thresholds), fields(n_rows = self.len(), n_thresholds = thresholds.len()))]
    pub fn curve(&self, kind: CurveKind, thresholds: &[f64]) -> Result<Curve, BrfError> {
        check_strictly_ordered(thresholds)?;
        let points = thresholds
            .iter()
            .map(|&threshold| {
                let rates = self.confusion_matrix(threshold).rates();
                let (x, y) = match kind {
                    CurveKind::Pr => (rates.recall, rates.precision),
                    CurveKind::Roc => (rates.false_positive_rate, rates.recall),
                };
                CurvePoint { threshold, x, y }
            })
            .collect();
        Ok(Curve { kind, points })
    }

    /// Precision-recall curve: x = recall, y = precision.
    ///
    /// # Errors
    ///
    /// See [`ScoredSet::curve`].
    pub fn pr_curve(&self, thresholds: &[f64]) -> Result<Curve, BrfError> {
        self.curve(CurveKind::Pr, thresholds)
    }

    /// ROC curve: x = false-positive rate, y = recall.
    ///
    /// # Errors
    ///
    /// See [`ScoredSet::curve`].
    pub fn roc_curve(&self, thresholds: &[f64]) -> Result<Curve, BrfError> {
        self.curve(CurveKind::Roc, thresholds)
    }

    /// Return the threshold with the highest F1, or `None` if F1 is
    /// undefined everywhere on the grid. Ties keep the earliest threshold.
    #[must_use]
    pub fn best_threshold(&self, thresholds: &[f64]) -> Option<ThresholdChoice> {
        let mut best: Option<ThresholdChoice> = None;
        for &threshold in thresholds {
            let confusion = self.confusion_matrix(threshold);
            let Some(f1) = confusion.f1() else {
                continue;
            };
            if best.is_none_or(|b| f1 > b.f1) {
                best = Some(ThresholdChoice {
                    threshold,
                    f1,
                    confusion,
                });
            }
        }
        best
    }
}

impl Curve {
    /// Return the curve kind.
    #[must_use]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    /// Return the points in threshold order.
    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Trapezoidal area over the points whose coordinates are both defined,
    /// sorted by x then y. `None` with fewer than two such points.
    #[must_use]
    pub fn area(&self) -> Option<f64> {
        let mut defined: Vec<(f64, f64)> = self
            .points
            .iter()
            .filter_map(|p| Some((p.x?, p.y?)))
            .collect();
        if defined.len() < 2 {
            return None;
        }
        defined.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        Some(
            defined
                .windows(2)
                .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
                .sum(),
        )
    }
}

impl<L: BaseLearner> BalancedForest<L> {
    /// Score `features` once and pair the scores with `labels`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::LabelCountMismatch`] | `features` and `labels` differ in length |
    /// | [`BrfError::EmptyEvaluationSet`] | no rows |
    /// | prediction errors | see [`BalancedForest::predict`] |
    pub fn score_set(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<ScoredSet, BrfError> {
        if features.len() != labels.len() {
            return Err(BrfError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(BrfError::EmptyEvaluationSet);
        }
        validate_labels(features.len(), labels)?;
        ScoredSet::new(self.predict(features)?, labels.to_vec())
    }

    /// Confusion matrix of the forest at `threshold`.
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::score_set`].
    pub fn confusion_matrix(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        threshold: f64,
    ) -> Result<ConfusionMatrix, BrfError> {
        Ok(self.score_set(features, labels)?.confusion_matrix(threshold))
    }

    /// Error rates of the forest at `threshold`, normalized by N.
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::score_set`].
    pub fn error_rates(&self, features: &[Vec<f64>], labels: &[usize], threshold: f64) -> Result<ErrorRates, BrfError> {
        Ok(self.score_set(features, labels)?.error_rates(threshold))
    }

    /// Precision-recall curve over `thresholds`, scoring the rows once.
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::score_set`] and [`ScoredSet::curve`].
    pub fn pr_curve(&self, features: &[Vec<f64>], labels: &[usize], thresholds: &[f64]) -> Result<Curve, BrfError> {
        self.score_set(features, labels)?.pr_curve(thresholds)
    }

    /// ROC curve over `thresholds`, scoring the rows once.
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::score_set`] and [`ScoredSet::curve`].
    pub fn roc_curve(&self, features: &[Vec<f64>], labels: &[usize], thresholds: &[f64]) -> Result<Curve, BrfError> {
        self.score_set(features, labels)?.roc_curve(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored() -> ScoredSet {
        // Scams score high except one, legits low except one.
        ScoredSet::new(
            vec![0.1, 0.2, 0.3, 0.8, 0.35, 0.7, 0.9, 0.95],
            vec![0, 0, 0, 0, 1, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn confusion_counts_sum_to_n() {
        let set = scored();
        for t in default_thresholds() {
            assert_eq!(set.confusion_matrix(t).total(), set.len());
        }
    }

    #[test]
    fn positive_count_non_increasing_in_threshold() {
        let set = scored();
        let counts: Vec<usize> = default_thresholds()
            .into_iter()
            .map(|t| set.confusion_matrix(t).predicted_positive())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn confusion_at_half() {
        let m = scored().confusion_matrix(0.5);
        assert_eq!(m.as_rows(), [[3, 1], [1, 3]]);
    }

    #[test]
    fn error_rates_normalized_by_total() {
        // 6 legit, 2 scam; at 0.5 one of each is wrong.
        let set = ScoredSet::new(
            vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 0.9, 0.1],
            vec![0, 0, 0, 0, 0, 0, 1, 1],
        )
        .unwrap();
        let rates = set.error_rates(0.5);
        assert!((rates.error - 0.25).abs() < 1e-12);
        assert!((rates.false_positive - 0.125).abs() < 1e-12);
        assert!((rates.false_negative - 0.125).abs() < 1e-12);

        // Class-normalized rates differ: FP / 6 legit and FN / 2 scam.
        let matrix = set.confusion_matrix(0.5);
        assert!((matrix.false_positive_rate().unwrap() - 1.0 / 6.0).abs() < 1e-12);
        assert!((1.0 - matrix.recall().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn curves_keep_caller_order() {
        let set = scored();
        let ascending = set.roc_curve(&[0.25, 0.5, 0.75]).unwrap();
        let descending = set.roc_curve(&[0.75, 0.5, 0.25]).unwrap();
        let up: Vec<f64> = ascending.points().iter().map(|p| p.threshold).collect();
        let down: Vec<f64> = descending.points().iter().map(|p| p.threshold).collect();
        assert_eq!(up, vec![0.25, 0.5, 0.75]);
        assert_eq!(down, vec![0.75, 0.5, 0.25]);
        assert_eq!(ascending.points()[0], descending.points()[2]);
    }

    #[test]
    fn pr_point_coordinates() {
        let set = scored();
        let curve = set.pr_curve(&[0.5]).unwrap();
        let point = curve.points()[0];
        assert_eq!(curve.kind(), CurveKind::Pr);
        assert_eq!(point.x, Some(0.75));
        assert_eq!(point.y, Some(0.75));
    }

    #[test]
    fn undefined_precision_surfaces_as_none() {
        let curve = scored().pr_curve(&[0.99]).unwrap();
        assert_eq!(curve.points()[0].x, Some(0.0));
        assert_eq!(curve.points()[0].y, None);
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let err = scored().roc_curve(&[0.1, 0.5, 0.3]).unwrap_err();
        assert!(matches!(err, BrfError::UnorderedThresholds { position: 2, .. }));
        let err = scored().roc_curve(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, BrfError::UnorderedThresholds { position: 1, .. }));
    }

    #[test]
    fn perfect_ranking_has_unit_roc_area() {
        let set = ScoredSet::new(vec![0.1, 0.2, 0.8, 0.9], vec![0, 0, 1, 1]).unwrap();
        let mut thresholds = vec![0.0];
        thresholds.extend(default_thresholds());
        thresholds.push(1.0);
        let area = set.roc_curve(&thresholds).unwrap().area().unwrap();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn area_needs_two_defined_points() {
        let curve = scored().pr_curve(&[0.99]).unwrap();
        assert_eq!(curve.area(), None);
    }

    #[test]
    fn best_threshold_maximizes_f1() {
        let set = ScoredSet::new(vec![0.1, 0.4, 0.6, 0.9], vec![0, 0, 1, 1]).unwrap();
        let choice = set.best_threshold(&[0.3, 0.5, 0.7]).unwrap();
        assert!((choice.threshold - 0.5).abs() < f64::EPSILON);
        assert!((choice.f1 - 1.0).abs() < 1e-12);
        assert_eq!(choice.confusion.as_rows(), [[2, 0], [0, 2]]);
    }

    #[test]
    fn rejects_empty_and_bad_labels() {
        assert!(matches!(ScoredSet::new(vec![], vec![]), Err(BrfError::EmptyEvaluationSet)));
        assert!(matches!(
            ScoredSet::new(vec![0.5, 0.5], vec![0, 3]),
            Err(BrfError::InvalidLabel { row_index: 1, label: 3 })
        ));
        assert!(matches!(
            ScoredSet::new(vec![0.5], vec![0, 1]),
            Err(BrfError::LabelCountMismatch { n_rows: 1, n_labels: 2 })
        ));
    }

    #[test]
    fn default_grid_spans_one_to_ninety_nine_percent() {
        let grid = default_thresholds();
        assert_eq!(grid.len(), 99);
        assert!((grid[0] - 0.01).abs() < f64::EPSILON);
        assert!((grid[98] - 0.99).abs() < f64::EPSILON);
    }
}
