//! JSON report writer for training, validation, and scoring outputs.

use std::fs;
use std::path::{Path, PathBuf};

use scamscan_brf::{
    Class, ConfusionMatrix, Curve, CurveKind, CurvePoint, ErrorRates, PartitionReport, ThresholdChoice,
    TrainingMetadata, ValidationReport,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes experiment reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluate.json`,
/// `{experiment}_validate.json`, and `{experiment}_scores.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn report_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()))
    }

    fn write_json(&self, path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::SerializeReport {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write a test-set evaluation to `{experiment}_evaluate.json`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        metadata: &TrainingMetadata,
        threshold: f64,
        confusion: &ConfusionMatrix,
        error_rates: &ErrorRates,
        roc: &Curve,
        pr: &Curve,
        best_threshold: Option<&ThresholdChoice>,
    ) -> Result<PathBuf, IoError> {
        let path = self.report_path("evaluate");

        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            training: metadata,
            threshold,
            confusion_matrix: confusion.as_rows(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            false_positive_rate: confusion.false_positive_rate(),
            f1: confusion.f1(),
            accuracy: confusion.accuracy(),
            error_rates,
            roc: CurveEntry::from(roc),
            pr: CurveEntry::from(pr),
            best_threshold,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "evaluation report written");
        Ok(path)
    }

    /// Write a partitioned validation report to `{experiment}_validate.json`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all)]
    pub fn write_validation(&self, report: &ValidationReport) -> Result<PathBuf, IoError> {
        let path = self.report_path("validate");

        let artifact = ValidateArtifact {
            experiment: self.experiment.as_str(),
            n_partitions: report.partitions.len(),
            threshold: report.threshold,
            mean_f1: report.mean_f1,
            partitions: &report.partitions,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "validation report written");
        Ok(path)
    }

    /// Write per-row scores and classes to `{experiment}_scores.json`.
    ///
    /// Row `i` is scam iff `scores[i] >= threshold`. Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all)]
    pub fn write_scores(&self, scores: &[f64], threshold: f64) -> Result<PathBuf, IoError> {
        let path = self.report_path("scores");

        let rows: Vec<ScoreEntry> = scores
            .iter()
            .enumerate()
            .map(|(row, &score)| ScoreEntry {
                row,
                score,
                class: if score >= threshold { Class::Scam } else { Class::Legit },
            })
            .collect();
        let n_flagged = rows.iter().filter(|r| r.class == Class::Scam).count();

        let artifact = ScoresArtifact {
            experiment: self.experiment.as_str(),
            threshold,
            n_rows: rows.len(),
            n_flagged,
            rows,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), n_flagged, "scores written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_model.bin", self.experiment.as_str()))
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    training: &'a TrainingMetadata,
    threshold: f64,
    confusion_matrix: [[usize; 2]; 2],
    precision: Option<f64>,
    recall: Option<f64>,
    false_positive_rate: Option<f64>,
    f1: Option<f64>,
    accuracy: Option<f64>,
    error_rates: &'a ErrorRates,
    roc: CurveEntry<'a>,
    pr: CurveEntry<'a>,
    best_threshold: Option<&'a ThresholdChoice>,
}

#[derive(Serialize)]
struct CurveEntry<'a> {
    kind: CurveKind,
    area: Option<f64>,
    points: &'a [CurvePoint],
}

impl<'a> From<&'a Curve> for CurveEntry<'a> {
    fn from(curve: &'a Curve) -> Self {
        Self {
            kind: curve.kind(),
            area: curve.area(),
            points: curve.points(),
        }
    }
}

#[derive(Serialize)]
struct ValidateArtifact<'a> {
    experiment: &'a str,
    n_partitions: usize,
    threshold: f64,
    mean_f1: Option<f64>,
    partitions: &'a [PartitionReport],
}

#[derive(Serialize)]
struct ScoresArtifact<'a> {
    experiment: &'a str,
    threshold: f64,
    n_rows: usize,
    n_flagged: usize,
    rows: Vec<ScoreEntry>,
}

#[derive(Serialize)]
struct ScoreEntry {
    row: usize,
    score: f64,
    class: Class,
}
