//! End-to-end orchestration: source → validation stages → identity → load.

use crate::context::PipelineContext;
use crate::error::OnboardingResult;
use crate::ingestion::{ingest_from_path, IngestionOptions};
use crate::load::{load_dataset, LoadReport, LoadTarget};
use crate::observability::severity_for_error;
use crate::processing::{identity, integrity, names, reduce, sanitize, schema, temporal, ReduceOp};
use crate::store::DocumentStore;
use crate::types::DataSet;

/// What the validation stages observed on a batch that passed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Rows that exactly duplicated another row before deduplication.
    pub duplicated_rows: usize,
    /// Rows dropped by deduplication.
    pub removed_duplicates: usize,
    /// Sign-checked columns whose values were replaced by absolute values.
    pub sign_corrected_columns: Vec<String>,
    /// Rows whose admission followed their discharge. Always 0 for a batch that passed.
    pub incoherent_dates: usize,
}

/// A validated dataset, ready to load, and the report of how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDataset {
    /// Dataset with identifier columns leading.
    pub dataset: DataSet,
    /// Stage observations.
    pub report: ValidationReport,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Validation observations.
    pub validation: ValidationReport,
    /// Load counts and metadata.
    pub load: LoadReport,
}

/// Run every validation and identity stage on `dataset`.
///
/// Stops at the first fatal condition. Duplicates are reported, logged and removed, never fatal.
pub fn process_dataset(ctx: &PipelineContext, dataset: DataSet) -> OnboardingResult<ProcessedDataset> {
    let ds = schema::normalize_columns(dataset)?;
    schema::check_required_columns(ctx, &ds)?;

    let duplicates = integrity::check_for_duplicates(ctx, &ds);
    integrity::check_for_nulls(ctx, &ds)?;

    let (ds, sign_corrected_columns) = sanitize::enforce_positive(ctx, ds)?;

    let before = ds.row_count();
    let ds = integrity::deduplicate(ds);
    let removed_duplicates = before - ds.row_count();
    if removed_duplicates > 0 {
        ctx.sink.info(&format!("removed {removed_duplicates} duplicated lines"));
    }

    let ds = names::normalize_names(ctx, &ds)?;
    let ds = temporal::parse_dates(ctx, &ds)?;
    temporal::check_date_coherence(ctx, &ds)?;
    log_admission_span(ctx, &ds);

    let ds = identity::assign_identifiers(ctx, ds)?;
    ctx.sink.info(&format!(
        "processed dataset: {} rows, {} columns",
        ds.row_count(),
        ds.column_count()
    ));

    Ok(ProcessedDataset {
        dataset: ds,
        report: ValidationReport {
            duplicated_rows: duplicates.duplicated_rows,
            removed_duplicates,
            sign_corrected_columns,
            incoherent_dates: 0,
        },
    })
}

fn log_admission_span(ctx: &PipelineContext, dataset: &DataSet) {
    let column = schema::normalize_column_name(&ctx.config.admission_column);
    let first = reduce(dataset, &column, ReduceOp::Min);
    let last = reduce(dataset, &column, ReduceOp::Max);
    if let (Some(first), Some(last)) = (first, last) {
        if !first.is_null() {
            ctx.sink.info(&format!("admissions span {first} to {last}"));
        }
    }
}

/// Read the configured source, process it, and load it into `store`.
///
/// Failures are logged to the context's sink at their severity and returned unchanged.
pub fn run(ctx: &PipelineContext, store: &dyn DocumentStore) -> OnboardingResult<RunSummary> {
    let result = run_stages(ctx, store);
    if let Err(e) = &result {
        ctx.sink.log(severity_for_error(e), &format!("onboarding failed: {e}"));
    }
    result
}

fn run_stages(ctx: &PipelineContext, store: &dyn DocumentStore) -> OnboardingResult<RunSummary> {
    ctx.sink.info(&format!("starting onboarding of {}", ctx.config.source.display()));

    let options = IngestionOptions {
        sink: Some(ctx.sink.clone()),
        ..Default::default()
    };
    let raw = ingest_from_path(&ctx.config.source, &ctx.config.schema, &options)?;

    let processed = process_dataset(ctx, raw)?;
    let load = load_dataset(
        ctx,
        &processed.dataset,
        store,
        &LoadTarget::from_config(&ctx.config),
    )?;

    Ok(RunSummary {
        validation: processed.report,
        load,
    })
}
