use std::fmt;

use crate::pool::Class;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Gini or entropy impurity of a node.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a binary decision tree arena.
///
/// Children are referenced by [`NodeIndex`] into the owning tree's
/// `Vec<Node>`, which keeps the tree flat and directly serializable.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Samples with `feature <= threshold` go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
    },
    /// A terminal leaf node.
    Leaf {
        /// Majority class; ties go to legit.
        prediction: Class,
        /// Fraction of this leaf's training samples that were scams.
        scam_fraction: f64,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Build a leaf from `[legit, scam]` counts.
    pub(crate) fn leaf(counts: [usize; 2], impurity: Impurity) -> Self {
        let n_samples = counts[0] + counts[1];
        let scam_fraction = if n_samples == 0 {
            0.0
        } else {
            counts[1] as f64 / n_samples as f64
        };
        let prediction = if counts[1] > counts[0] {
            Class::Scam
        } else {
            Class::Legit
        };
        Node::Leaf {
            prediction,
            scam_fraction,
            impurity,
            n_samples,
        }
    }

    /// Return the impurity at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_from_counts() {
        let leaf = Node::leaf([1, 3], Impurity::new(0.375));
        match leaf {
            Node::Leaf {
                prediction,
                scam_fraction,
                n_samples,
                ..
            } => {
                assert_eq!(prediction, Class::Scam);
                assert!((scam_fraction - 0.75).abs() < f64::EPSILON);
                assert_eq!(n_samples, 4);
            }
            Node::Split { .. } => panic!("expected a leaf"),
        }
    }

    #[test]
    fn tied_leaf_predicts_legit() {
        let leaf = Node::leaf([2, 2], Impurity::new(0.5));
        assert!(matches!(leaf, Node::Leaf { prediction: Class::Legit, .. }));
        assert!(leaf.is_leaf());
    }

    #[test]
    fn split_accessors() {
        let split = Node::Split {
            feature: FeatureIndex::new(2),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.48),
            n_samples: 20,
        };
        assert!(!split.is_leaf());
        assert_eq!(split.n_samples(), 20);
        assert!((split.impurity().value() - 0.48).abs() < f64::EPSILON);
    }

    #[test]
    fn impurity_display() {
        assert_eq!(format!("{}", Impurity::new(0.333333)), "0.333333");
        assert_eq!(format!("{}", FeatureIndex::new(3)), "3");
    }
}
