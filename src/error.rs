use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for onboarding operations.
pub type OnboardingResult<T> = Result<T, OnboardingError>;

/// Error type returned by every stage of the onboarding pipeline.
///
/// A single enum is shared by the tabular sources, the validation stages, the identity assigner
/// and the transactional loader, so callers can match on the failure kind instead of on where it
/// came from.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// Underlying I/O error (e.g. permission denied, disk full).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV source error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input resource does not exist.
    #[error("could not find file '{}'", path.display())]
    NotFound { path: PathBuf },

    /// Required columns are absent after column-name normalization.
    #[error("missing required columns in dataset: {missing:?}")]
    Schema { missing: Vec<String> },

    /// The raw input does not have the shape a tabular source expects.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Required columns contain null values. Every offending column is listed.
    #[error("columns with missing values in required columns: {null_counts:?}")]
    Validation { null_counts: BTreeMap<String, usize> },

    /// The configuration does not match the dataset or is incomplete.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A sign-checked column contains zero or negative values and replacement is disabled.
    #[error("column '{column}' contains zero or negative values")]
    Value { column: String },

    /// Rows where the admission date is later than the discharge date.
    #[error("{incoherent_rows} row(s) have '{discharge}' anterior to '{admission}'")]
    DataIntegrity {
        incoherent_rows: usize,
        admission: String,
        discharge: String,
    },

    /// An identifier column could not be computed.
    #[error("error when creating '{target}': {message}")]
    IdentityComputation { target: String, message: String },

    /// The post-insert document count does not reconcile with the pre-insert count.
    #[error("number of documents in collection does not match target: expected {expected}, found {actual}")]
    CountMismatch { expected: u64, actual: u64 },

    /// The store could not be reached.
    #[error("could not connect to store: {message}")]
    Connection { message: String },

    /// The store rejected an operation.
    #[error("store error: {message}")]
    Store { message: String },
}
