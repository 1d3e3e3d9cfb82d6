//! CSV source.

use std::path::Path;

use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::schema::declared_type;
use crate::processing::temporal::{parse_date, parse_datetime};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Read a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - The dataset has exactly the file's columns, in file order, named as in the header.
/// - A header typed by the schema is parsed as that field's type. A header matches a field when
///   both names agree after column-name normalization, so `Date of Admission` picks up a
///   `date_of_admission` field. Other headers are kept as `Utf8`.
/// - Schema fields with no header are left out; required-column checks report them later.
/// - Empty cells are nulls.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> OnboardingResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Read CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> OnboardingResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let fields: Vec<Field> = headers
        .iter()
        .map(|h| Field::new(h, declared_type(schema, h).unwrap_or(DataType::Utf8)))
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: DataType,
    raw: &str,
) -> OnboardingResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| OnboardingError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
        DataType::Date => parse_date(trimmed).map(Value::Date).map_err(parse_error),
        DataType::DateTime => parse_datetime(trimmed).map(Value::DateTime).map_err(parse_error),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
