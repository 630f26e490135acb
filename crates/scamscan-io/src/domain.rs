//! Domain types for scamscan-io.

use std::path::{Path, PathBuf};

use scamscan_brf::{BrfError, Class, LabeledPool};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing features read from one CSV file.
///
/// Produced by [`FeatureReader`](crate::FeatureReader). `rows[i]` holds the
/// features of the i-th listing, in header column order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    path: PathBuf,
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub(crate) fn new(path: PathBuf, feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self {
            path,
            feature_names,
            rows,
        }
    }

    /// Return the file the matrix was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of listings.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Check that `other` has the same feature columns, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::HeaderMismatch`] if the headers differ.
    pub fn check_same_columns(&self, other: &FeatureMatrix) -> Result<(), IoError> {
        if self.feature_names != other.feature_names {
            return Err(IoError::HeaderMismatch {
                path: other.path.clone(),
                reference: self.path.clone(),
                expected: self.feature_names.clone(),
                got: other.feature_names.clone(),
            });
        }
        Ok(())
    }

    /// Check that this matrix has exactly the `expected` columns, in order.
    ///
    /// `reference` names where `expected` came from, such as a model file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::HeaderMismatch`] if the headers differ.
    pub fn check_columns(&self, reference: &Path, expected: &[String]) -> Result<(), IoError> {
        if self.feature_names != expected {
            return Err(IoError::HeaderMismatch {
                path: self.path.clone(),
                reference: reference.to_path_buf(),
                expected: expected.to_vec(),
                got: self.feature_names.clone(),
            });
        }
        Ok(())
    }

    /// Consume the matrix into a single-class pool for training.
    ///
    /// # Errors
    ///
    /// Propagates [`LabeledPool::new`] errors.
    pub fn into_pool(self, class: Class) -> Result<LabeledPool, BrfError> {
        LabeledPool::new(class, self.rows)
    }
}
