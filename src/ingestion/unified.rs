//! Unified tabular source entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which reads a file into an in-memory
//! [`crate::types::DataSet`] using a provided [`crate::types::Schema`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If a [`LogSink`] is provided, success/failure/alerts are reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{OnboardingError, OnboardingResult};
use crate::observability::{severity_for_error, LogLevel, LogSink};
use crate::types::{DataSet, Schema};

use super::{csv, json};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Optional sink for outcome reporting.
    pub sink: Option<Arc<dyn LogSink>>,
    /// Severity at or above which a failure is additionally reported as an alert.
    pub alert_at_or_above: LogLevel,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("sink_set", &self.sink.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            sink: None,
            alert_at_or_above: LogLevel::Critical,
        }
    }
}

/// Unified entry point for path-based sources.
///
/// A path that does not exist fails with [`OnboardingError::NotFound`] before any parsing.
///
/// When a sink is configured, this function reports:
///
/// - an `Info` line with the row count on success
/// - a line at the computed severity on failure
/// - an `ALERT` line when that severity is >= `options.alert_at_or_above`
///
/// ```no_run
/// use data_onboarding::ingestion::{ingest_from_path, IngestionOptions};
/// use data_onboarding::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), data_onboarding::OnboardingError> {
/// let schema = Schema::new(vec![
///     Field::new("name", DataType::Utf8),
///     Field::new("age", DataType::Int64),
/// ]);
/// let ds = ingest_from_path("admissions.csv", &schema, &IngestionOptions::default())?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> OnboardingResult<DataSet> {
    let path = path.as_ref();
    let result = ingest_resolved(path, schema, options.format);

    if let Some(sink) = options.sink.as_ref() {
        match &result {
            Ok(ds) => sink.info(&format!(
                "ingested path={} rows={} columns={}",
                path.display(),
                ds.row_count(),
                ds.column_count()
            )),
            Err(e) => {
                let sev = severity_for_error(e);
                sink.log(sev, &format!("ingest failed path={} err={e}", path.display()));
                if sev >= options.alert_at_or_above {
                    sink.log(sev, &format!("ALERT ingest path={} err={e}", path.display()));
                }
            }
        }
    }

    result
}

fn ingest_resolved(
    path: &Path,
    schema: &Schema,
    format: Option<IngestionFormat>,
) -> OnboardingResult<DataSet> {
    if !path.exists() {
        return Err(OnboardingError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let fmt = match format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, schema),
        IngestionFormat::Json => json::ingest_json_from_path(path, schema),
    }
}

fn infer_format_from_path(path: &Path) -> OnboardingResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| OnboardingError::SchemaMismatch {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| OnboardingError::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}
