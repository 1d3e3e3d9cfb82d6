//! Date parsing and admission/discharge ordering.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::schema::{normalize_column_name, require_column};
use crate::types::{DataSet, DataType, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse `YYYY-MM-DD`, optionally followed by a time of day or an RFC 3339 offset.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| format!("expected an ISO date or datetime, got '{s}'"))
}

/// Parse a calendar date; a datetime is truncated to its date.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        Ok(d) => Ok(d),
        Err(_) => parse_datetime(s).map(|dt| dt.date()),
    }
}

/// Convert one column to [`DataType::DateTime`].
///
/// Text is parsed with [`parse_datetime`], dates become midnight, nulls stay null. Anything else
/// fails with [`OnboardingError::ParseError`] (rows are reported 1-based).
pub fn parse_datetime_column(dataset: &DataSet, column: &str) -> OnboardingResult<DataSet> {
    let idx = require_column(dataset, column)?;
    let name = dataset.schema.fields[idx].name.clone();
    dataset.try_map_column(idx, DataType::DateTime, |row, v| {
        let parse_error = |raw: String, message: String| OnboardingError::ParseError {
            row: row + 1,
            column: name.clone(),
            raw,
            message,
        };
        match v {
            Value::Null => Ok(Value::Null),
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::Date(d) => Ok(Value::DateTime(d.and_time(chrono::NaiveTime::MIN))),
            Value::Utf8(s) => parse_datetime(s)
                .map(Value::DateTime)
                .map_err(|message| parse_error(s.clone(), message)),
            other => Err(parse_error(
                other.to_string(),
                "expected a date or datetime".to_string(),
            )),
        }
    })
}

/// Parse the admission column and, when the dataset has one, the discharge column.
pub fn parse_dates(ctx: &PipelineContext, dataset: &DataSet) -> OnboardingResult<DataSet> {
    let mut out = parse_datetime_column(dataset, &ctx.config.admission_column)?;
    let discharge = normalize_column_name(&ctx.config.discharge_column);
    if out.schema.contains(&discharge) {
        out = parse_datetime_column(&out, &discharge)?;
    }
    Ok(out)
}

/// Number of rows whose admission is later than their discharge. Rows with a null on either
/// side are not compared.
pub fn count_incoherent_rows(dataset: &DataSet, admission: usize, discharge: usize) -> usize {
    dataset.reduce_rows(0, |n, row| match (row.get(admission), row.get(discharge)) {
        (Some(Value::DateTime(a)), Some(Value::DateTime(d))) if a > d => n + 1,
        _ => n,
    })
}

/// Fail with [`OnboardingError::DataIntegrity`] if any admission follows its discharge.
///
/// Skipped entirely when the dataset has no discharge column. Expects [`parse_dates`] to have
/// run first.
pub fn check_date_coherence(ctx: &PipelineContext, dataset: &DataSet) -> OnboardingResult<()> {
    let admission = normalize_column_name(&ctx.config.admission_column);
    let discharge = normalize_column_name(&ctx.config.discharge_column);

    let Some(discharge_idx) = dataset.schema.index_of(&discharge) else {
        ctx.sink
            .info(&format!("no '{discharge}' column, skipping date coherence check"));
        return Ok(());
    };
    let admission_idx = require_column(dataset, &admission)?;

    let incoherent_rows = count_incoherent_rows(dataset, admission_idx, discharge_idx);
    if incoherent_rows > 0 {
        return Err(OnboardingError::DataIntegrity {
            incoherent_rows,
            admission,
            discharge,
        });
    }

    ctx.sink.info(&format!("'{admission}' precedes '{discharge}' on every row"));
    Ok(())
}
