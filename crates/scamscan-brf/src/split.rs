use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    #[default]
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its `[legit, scam]` counts.
    ///
    /// An empty node has zero impurity.
    #[must_use]
    pub fn impurity(&self, counts: [usize; 2]) -> Impurity {
        let n_samples = counts[0] + counts[1];
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// The winning split for one node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Threshold between two adjacent distinct sorted values.
///
/// The midpoint can round up to `next` (adjacent floats) or overflow; `value`
/// is used then, so `<= threshold` always separates the two.
fn split_threshold(value: f64, next: f64) -> f64 {
    let mid = value / 2.0 + next / 2.0;
    if mid >= next || mid < value { value } else { mid }
}

/// Find the best split among `max_features` randomly chosen columns.
///
/// `columns` is column-major: `columns[feature][sample]`. For each chosen
/// column the `(value, sample)` pairs are sorted and scanned once, moving
/// one sample at a time from the right child's counts to the left's.
///
/// Returns `None` when every candidate column is constant over
/// `sample_indices` or every boundary would leave a child smaller than
/// `min_samples_leaf`.
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = columns.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = [0usize; 2];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }
    let parent_impurity = criterion.impurity(parent_counts).value();

    // Partial Fisher-Yates over the column order.
    let take = max_features.min(n_features);
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let column = &columns[feat_idx];
        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (column[si], si)).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = [0usize; 2];
        let mut right = parent_counts;

        for i in 0..(n_samples - 1) {
            let (value, si) = sorted[i];
            left[labels[si]] += 1;
            right[labels[si]] -= 1;

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let decrease = n_samples as f64 * parent_impurity
                - n_left as f64 * criterion.impurity(left).value()
                - n_right as f64 * criterion.impurity(right).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), split_threshold(value, next)));
            }
        }
    }

    let (feature, threshold) = best?;
    let column = &columns[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| column[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}
