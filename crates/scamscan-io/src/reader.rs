//! CSV feature reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::FeatureMatrix;

/// Reads one class's listing features from a CSV file.
///
/// Expected CSV format:
/// - Header row required; every column is a feature name
/// - `feature1,feature2,...,featureN`
/// - One row per listing, all rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header names no columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct FeatureReader {
    path: PathBuf,
}

impl FeatureReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    /// Read and validate the CSV file, returning a [`FeatureMatrix`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureMatrix, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows reach our own InconsistentRowLength check.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let feature_names: Vec<String> = header.iter().map(String::from).collect();
        let expected = feature_names.len();
        if feature_names.iter().all(String::is_empty) {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        debug!(expected, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(expected);
            for (raw, column) in record.iter().zip(&feature_names) {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: column.clone(),
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_rows = rows.len(),
            n_features = feature_names.len(),
            "feature matrix loaded"
        );

        Ok(FeatureMatrix::new(self.path.clone(), feature_names, rows))
    }
}
