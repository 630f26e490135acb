//! Model serialization and deserialization via bincode.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::error::BrfError;
use crate::forest::BalancedForest;
use crate::learner::BaseLearner;

/// Current binary format version.
const FORMAT_VERSION: u32 = 2;

/// Placeholder path for models read from or written to a stream.
const STREAM_PATH: &str = "<stream>";

/// Versioned envelope, borrowed for writing.
#[derive(serde::Serialize)]
struct EnvelopeRef<'a, L> {
    format_version: u32,
    n_estimators: usize,
    n_features: usize,
    seed: u64,
    feature_names: &'a [String],
    learners: &'a [L],
}

/// Versioned envelope, owned for reading.
#[derive(serde::Deserialize)]
struct Envelope<L> {
    format_version: u32,
    n_estimators: usize,
    n_features: usize,
    seed: u64,
    feature_names: Vec<String>,
    learners: Vec<L>,
}

impl<L: Serialize> BalancedForest<L> {
    /// Encode the model into its versioned byte form.
    ///
    /// # Errors
    ///
    /// Returns [`BrfError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BrfError> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            n_estimators: self.learners.len(),
            n_features: self.n_features,
            seed: self.seed,
            feature_names: &self.feature_names,
            learners: &self.learners,
        };
        bincode::serialize(&envelope).map_err(|e| BrfError::SerializeModel { source: e })
    }

    /// Write the model to any writer.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::SerializeModel`] | bincode encoding failed |
    /// | [`BrfError::WriteModel`] | the writer failed |
    pub fn save_to_writer(&self, mut writer: impl Write) -> Result<(), BrfError> {
        let bytes = self.to_bytes()?;
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| BrfError::WriteModel {
                path: PathBuf::from(STREAM_PATH),
                source: e,
            })
    }

    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::SerializeModel`] | bincode encoding failed |
    /// | [`BrfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BrfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, &bytes).map_err(|e| BrfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_estimators = self.learners.len(),
            "model saved"
        );

        Ok(())
    }
}

impl<L: BaseLearner + DeserializeOwned> BalancedForest<L> {
    /// Decode a model from its versioned byte form.
    ///
    /// `path` only labels errors.
    fn decode(bytes: &[u8], path: &Path) -> Result<Self, BrfError> {
        // The version leads the envelope; check it before decoding the rest.
        let format_version: u32 = bincode::deserialize(bytes).map_err(|e| BrfError::DeserializeModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        if format_version != FORMAT_VERSION {
            return Err(BrfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: format_version,
                path: path.to_path_buf(),
            });
        }

        let envelope: Envelope<L> = bincode::deserialize(bytes).map_err(|e| BrfError::DeserializeModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        if envelope.learners.is_empty() || envelope.learners.len() != envelope.n_estimators {
            return Err(BrfError::CorruptModel {
                path: path.to_path_buf(),
                reason: format!(
                    "header declares {} learners, found {}",
                    envelope.n_estimators,
                    envelope.learners.len()
                ),
            });
        }
        if envelope.n_features == 0 {
            return Err(BrfError::CorruptModel {
                path: path.to_path_buf(),
                reason: "header declares zero features".to_string(),
            });
        }

        if !envelope.feature_names.is_empty() && envelope.feature_names.len() != envelope.n_features {
            return Err(BrfError::CorruptModel {
                path: path.to_path_buf(),
                reason: format!(
                    "{} feature names for {} features",
                    envelope.feature_names.len(),
                    envelope.n_features
                ),
            });
        }
        for (idx, learner) in envelope.learners.iter().enumerate() {
            learner
                .check_integrity(envelope.n_features)
                .map_err(|reason| BrfError::CorruptModel {
                    path: path.to_path_buf(),
                    reason: format!("learner {idx}: {reason}"),
                })?;
        }

        debug!(
            format_version = envelope.format_version,
            n_estimators = envelope.n_estimators,
            n_features = envelope.n_features,
            "model loaded"
        );

        Ok(Self {
            learners: envelope.learners,
            n_features: envelope.n_features,
            seed: envelope.seed,
            feature_names: envelope.feature_names,
        })
    }

    /// Decode a model from bytes produced by [`BalancedForest::to_bytes`].
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::load`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BrfError> {
        Self::decode(bytes, Path::new(STREAM_PATH))
    }

    /// Read a model from any reader.
    ///
    /// # Errors
    ///
    /// See [`BalancedForest::load`].
    pub fn load_from_reader(mut reader: impl Read) -> Result<Self, BrfError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|e| BrfError::ReadModel {
            path: PathBuf::from(STREAM_PATH),
            source: e,
        })?;
        Self::decode(&bytes, Path::new(STREAM_PATH))
    }

    /// Load a model from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BrfError::ReadModel`] | file read failed |
    /// | [`BrfError::DeserializeModel`] | bincode decoding failed |
    /// | [`BrfError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`BrfError::CorruptModel`] | header disagrees with the stored learners, or a learner fails its integrity check |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BrfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| BrfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::decode(&bytes, path)
    }
}
