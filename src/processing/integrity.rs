//! Exact-duplicate detection, required-field null checks, and deduplication.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::reduce::{reduce, ReduceOp};
use crate::processing::schema::{normalize_column_name, require_column};
use crate::types::{DataSet, Value};

/// Outcome of duplicate detection. Duplicates never fail the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DuplicateReport {
    /// Rows that have at least one identical sibling (every member of a group is counted).
    pub duplicated_rows: usize,
    /// Rows left after keeping one row per group.
    pub distinct_rows: usize,
}

/// Hashable, comparable stand-in for a cell. Floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<&Value> for CellKey {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Int64(n) => Self::Int(*n),
            Value::Float64(f) => Self::Float(f.to_bits()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Utf8(s) => Self::Text(s.clone()),
            Value::Date(d) => Self::Date(*d),
            Value::DateTime(dt) => Self::DateTime(*dt),
        }
    }
}

fn row_key(row: &[Value]) -> Vec<CellKey> {
    row.iter().map(CellKey::from).collect()
}

/// Count rows that exactly duplicate another row (all columns equal).
pub fn find_duplicates(dataset: &DataSet) -> DuplicateReport {
    let mut groups: HashMap<Vec<CellKey>, usize> = HashMap::with_capacity(dataset.row_count());
    for row in &dataset.rows {
        *groups.entry(row_key(row)).or_insert(0) += 1;
    }

    DuplicateReport {
        duplicated_rows: groups.values().filter(|&&n| n > 1).sum(),
        distinct_rows: groups.len(),
    }
}

/// Detect duplicates and log a warning when there are any.
pub fn check_for_duplicates(ctx: &PipelineContext, dataset: &DataSet) -> DuplicateReport {
    let report = find_duplicates(dataset);
    if report.duplicated_rows > 0 {
        ctx.sink.warn(&format!(
            "dataset contains {} duplicated lines",
            report.duplicated_rows
        ));
    }
    report
}

/// Null count per column, for the listed columns.
pub fn null_counts(
    dataset: &DataSet,
    columns: &[String],
) -> OnboardingResult<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for column in columns {
        require_column(dataset, column)?;
        let name = normalize_column_name(column);
        let n = match reduce(dataset, &name, ReduceOp::NullCount) {
            Some(Value::Int64(n)) => n as usize,
            _ => 0,
        };
        counts.insert(name, n);
    }
    Ok(counts)
}

/// Fail with [`OnboardingError::Validation`] if any required column holds nulls.
///
/// Every offending column is reported in the same error.
pub fn check_for_nulls(ctx: &PipelineContext, dataset: &DataSet) -> OnboardingResult<()> {
    let offending: BTreeMap<String, usize> = null_counts(dataset, &ctx.config.required_columns)?
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect();

    if !offending.is_empty() {
        return Err(OnboardingError::Validation {
            null_counts: offending,
        });
    }

    ctx.sink.info("no missing values in required columns");
    Ok(())
}

/// Drop exact duplicate rows, keeping the first occurrence and the original order.
pub fn deduplicate(dataset: DataSet) -> DataSet {
    let mut seen = HashSet::with_capacity(dataset.row_count());
    let rows = dataset
        .rows
        .into_iter()
        .filter(|row| seen.insert(row_key(row)))
        .collect();
    DataSet::new(dataset.schema, rows)
}
