use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    BrfError,
    node::{Node, NodeIndex},
    pool::{Class, validate_labels, validate_matrix},
    split::{SplitCriterion, find_best_split},
};

/// Strategy for the number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    #[default]
    Sqrt,
    /// Log base 2 of total features, rounded up.
    Log2,
    /// A fraction of total features, rounded up (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::InvalidMaxFeatures`] if the count is 0 or exceeds `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, BrfError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(BrfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for a single binary CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default             |
/// |---------------------|---------------------|
/// | `criterion`         | `Gini`              |
/// | `max_depth`         | `None` (unlimited)  |
/// | `min_samples_split` | 2                   |
/// | `min_samples_leaf`  | 1                   |
/// | `max_features`      | `Sqrt`              |
/// | `seed`              | 42                  |
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth. `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set how many features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for feature subsetting.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on row-major features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                              |
    /// |--------------------------------------|---------------------------------------------------|
    /// | [`BrfError::EmptyDataset`]           | `features` is empty                               |
    /// | [`BrfError::ZeroFeatures`]           | rows have zero feature columns                    |
    /// | [`BrfError::FeatureCountMismatch`]   | rows have inconsistent lengths                    |
    /// | [`BrfError::NonFiniteValue`]         | any value is NaN or infinite                      |
    /// | [`BrfError::LabelCountMismatch`]     | `labels.len() != features.len()`                  |
    /// | [`BrfError::InvalidLabel`]           | a label is not 0 or 1                             |
    /// | [`BrfError::InvalidMaxFeatures`]     | `max_features` resolves outside [1, n_features]   |
    /// | [`BrfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                          |
    /// | [`BrfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                           |
    /// | [`BrfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                            |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, BrfError> {
        let n_features = validate_matrix(features)?;
        validate_labels(features.len(), labels)?;

        if self.max_depth == Some(0) {
            return Err(BrfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(BrfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(BrfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.resolve(n_features)?;

        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut builder = TreeBuilder {
            columns: &columns,
            labels,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(&sample_indices, 0);

        debug!(
            n_features,
            max_features,
            n_nodes = builder.arena.len(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive arena construction state for one tree.
struct TreeBuilder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [usize],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Build the subtree over `sample_indices` and return its root index.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let mut counts = [0usize; 2];
        for &si in sample_indices {
            counts[self.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(counts);
        let n_samples = sample_indices.len();

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() == 0.0;

        let split = if too_few || pure || depth_exceeded {
            None
        } else {
            find_best_split(
                self.columns,
                self.labels,
                sample_indices,
                self.config.criterion,
                self.max_features,
                self.config.min_samples_leaf,
                &mut self.rng,
            )
        };

        let Some(split) = split else {
            self.arena.push(Node::leaf(counts, impurity));
            return NodeIndex::new(self.arena.len() - 1);
        };

        // Reserve this node's slot so children get later indices.
        let node_idx = self.arena.len();
        self.arena.push(Node::leaf(counts, impurity));

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
        };
        NodeIndex::new(node_idx)
    }
}

/// A fitted binary CART decision tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the class of a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<Class, BrfError> {
        self.check_width(sample)?;
        Ok(self.leaf_for(sample).0)
    }

    /// Return the scam fraction of the leaf a sample lands in.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_scam_fraction(&self, sample: &[f64]) -> Result<f64, BrfError> {
        self.check_width(sample)?;
        Ok(self.leaf_for(sample).1)
    }

    /// Return the number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Verify the arena can be walked safely for `n_features`-wide rows.
    ///
    /// Every split must reference a feature below `n_features` and children
    /// that come after it in the arena, which rules out cycles. Leaves must
    /// hold a scam fraction in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation.
    pub fn check_structure(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        if self.n_features != n_features {
            return Err(format!(
                "tree expects {} features, model declares {n_features}",
                self.n_features
            ));
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {} of {n_features}",
                            feature.index()
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for child in [left.index(), right.index()] {
                        if child <= idx || child >= n_nodes {
                            return Err(format!(
                                "node {idx} points to child {child} outside ({idx}, {n_nodes})"
                            ));
                        }
                    }
                }
                Node::Leaf { scam_fraction, .. } => {
                    if !(0.0..=1.0).contains(scam_fraction) {
                        return Err(format!("leaf {idx} has scam fraction {scam_fraction}"));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), BrfError> {
        if sample.len() != self.n_features {
            return Err(BrfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Walk from the root to a leaf and return its `(prediction, scam_fraction)`.
    fn leaf_for(&self, sample: &[f64]) -> (Class, f64) {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    scam_fraction,
                    ..
                } => return (*prediction, *scam_fraction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
