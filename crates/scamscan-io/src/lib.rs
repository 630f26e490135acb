//! File I/O, validation, and report serialization for the scamscan pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, FeatureMatrix};
pub use error::IoError;
pub use reader::FeatureReader;
pub use writer::ReportWriter;
