use std::path::PathBuf;

use crate::pool::Class;

/// Coarse classification of [`BrfError`] variants.
///
/// Callers that only need to decide how to report a failure can match on
/// this instead of on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A pool or evaluation set is too small for the requested operation.
    InsufficientData,
    /// Feature widths, label counts, or label values do not line up.
    ShapeMismatch,
    /// Prediction was requested from an ensemble with no learners.
    UntrainedModel,
    /// Persisted model state could not be written, read, or decoded.
    Serialization,
    /// A configuration value is out of range.
    InvalidConfig,
}

/// Errors from balanced forest training, prediction, evaluation, and storage.
#[derive(Debug, thiserror::Error)]
pub enum BrfError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidEstimatorCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when train_fraction is not in (0.0, 1.0].
    #[error("train_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidTrainFraction {
        /// The invalid train_fraction value provided.
        fraction: f64,
    },

    /// Returned when fewer than two validation partitions are requested.
    #[error("n_partitions must be at least 2, got {n_partitions}")]
    InvalidPartitionCount {
        /// The invalid partition count.
        n_partitions: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when a threshold sweep is not strictly increasing or decreasing.
    #[error("thresholds must be strictly ordered: {previous} then {next} at position {position}")]
    UnorderedThresholds {
        /// Zero-based position of the offending threshold.
        position: usize,
        /// The threshold before it.
        previous: f64,
        /// The offending threshold.
        next: f64,
    },

    /// Returned when a pool holds fewer rows than an operation needs.
    #[error("{class} pool has {available} rows, need at least {required}")]
    InsufficientData {
        /// The class whose pool is too small.
        class: Class,
        /// Rows available in the pool.
        available: usize,
        /// Rows the operation requires.
        required: usize,
    },

    /// Returned when a pool has no rows at all.
    #[error("{class} pool is empty")]
    EmptyPool {
        /// The class whose pool is empty.
        class: Class,
    },

    /// Returned when an evaluation set has zero rows.
    #[error("evaluation set has zero rows")]
    EmptyEvaluationSet,

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the two pools disagree on dimensionality.
    #[error("legit pool has {legit} features per row but scam pool has {scam}")]
    PoolDimensionMismatch {
        /// Width of the legit rows.
        legit: usize,
        /// Width of the scam rows.
        scam: usize,
    },

    /// Returned when the recorded feature names do not cover every column.
    #[error("{got} feature names for {expected} features")]
    FeatureNameCountMismatch {
        /// The number of features.
        expected: usize,
        /// The number of names supplied.
        got: usize,
    },

    /// Returned when features and labels have different lengths.
    #[error("{n_rows} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a label is neither 0 (legit) nor 1 (scam).
    #[error("label {label} at row {row_index} is not 0 or 1")]
    InvalidLabel {
        /// The zero-based index of the offending row.
        row_index: usize,
        /// The label found.
        label: usize,
    },

    /// Returned when a learner returns a score vector of the wrong length.
    #[error("learner returned {got} scores for {expected} rows")]
    ScoreCountMismatch {
        /// Rows submitted for scoring.
        expected: usize,
        /// Scores returned.
        got: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when predicting with an ensemble (or learner) that holds no trained state.
    #[error("model has no trained learners")]
    UntrainedModel,

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Where the bytes came from (a file path, or `<reader>`).
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when the stored header disagrees with the stored learners.
    #[error("corrupt model in {path}: {reason}")]
    CorruptModel {
        /// Path to the model file.
        path: PathBuf,
        /// What did not add up.
        reason: String,
    },
}

impl BrfError {
    /// Map this error onto the coarse [`ErrorKind`] taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrfError::InvalidEstimatorCount { .. }
            | BrfError::InvalidTrainFraction { .. }
            | BrfError::InvalidPartitionCount { .. }
            | BrfError::InvalidMaxDepth { .. }
            | BrfError::InvalidMinSamplesSplit { .. }
            | BrfError::InvalidMinSamplesLeaf { .. }
            | BrfError::InvalidMaxFeatures { .. }
            | BrfError::UnorderedThresholds { .. } => ErrorKind::InvalidConfig,
            BrfError::InsufficientData { .. }
            | BrfError::EmptyPool { .. }
            | BrfError::EmptyEvaluationSet
            | BrfError::EmptyDataset => ErrorKind::InsufficientData,
            BrfError::ZeroFeatures
            | BrfError::FeatureCountMismatch { .. }
            | BrfError::PoolDimensionMismatch { .. }
            | BrfError::FeatureNameCountMismatch { .. }
            | BrfError::LabelCountMismatch { .. }
            | BrfError::InvalidLabel { .. }
            | BrfError::ScoreCountMismatch { .. }
            | BrfError::PredictionFeatureMismatch { .. }
            | BrfError::NonFiniteValue { .. } => ErrorKind::ShapeMismatch,
            BrfError::UntrainedModel => ErrorKind::UntrainedModel,
            BrfError::SerializeModel { .. }
            | BrfError::DeserializeModel { .. }
            | BrfError::WriteModel { .. }
            | BrfError::ReadModel { .. }
            | BrfError::IncompatibleModelVersion { .. }
            | BrfError::CorruptModel { .. } => ErrorKind::Serialization,
        }
    }
}
