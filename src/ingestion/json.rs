//! JSON source.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of the objects' keys in first-seen order; keys that agree after
//! column-name normalization share one column. A key typed by the schema is converted to that
//! field's type, any other key is kept as `Utf8`. Schema fields that no object carries are left
//! out. A key missing from one object reads as null in that row.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::schema::{declared_type, normalize_column_name};
use crate::processing::temporal::{parse_date, parse_datetime};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Read a JSON or NDJSON file into an in-memory [`DataSet`].
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> OnboardingResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, schema)
}

/// Read JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> OnboardingResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(OnboardingError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match v {
            serde_json::Value::Array(items) => ingest_json_values(&items, schema),
            serde_json::Value::Object(_) => ingest_json_values(std::slice::from_ref(&v), schema),
            _ => Err(OnboardingError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        }
    } else {
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
                OnboardingError::SchemaMismatch {
                    message: format!("invalid ndjson at line {}: {}", i + 1, e),
                }
            })?;
            values.push(v);
        }
        ingest_json_values(&values, schema)
    }
}

fn ingest_json_values(values: &[serde_json::Value], schema: &Schema) -> OnboardingResult<DataSet> {
    let mut objects = Vec::with_capacity(values.len());
    for (idx0, v) in values.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| OnboardingError::SchemaMismatch {
            message: format!("row {} is not a json object", idx0 + 1),
        })?;
        objects.push(obj);
    }

    // Canonical key -> column index, plus the declared type of each column (None = untyped).
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut types: Vec<Option<DataType>> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            let canonical = normalize_column_name(key);
            if index.contains_key(&canonical) {
                continue;
            }
            let declared = declared_type(schema, key);
            index.insert(canonical, fields.len());
            fields.push(Field::new(key.as_str(), declared.unwrap_or(DataType::Utf8)));
            types.push(declared);
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(objects.len());
    for (idx0, obj) in objects.iter().enumerate() {
        let row_num = idx0 + 1;
        let mut row = vec![Value::Null; fields.len()];
        let mut filled = vec![false; fields.len()];
        for (key, jv) in obj.iter() {
            let col = index[&normalize_column_name(key)];
            if std::mem::replace(&mut filled[col], true) {
                return Err(OnboardingError::SchemaMismatch {
                    message: format!(
                        "row {row_num} has more than one key for column '{}'",
                        fields[col].name
                    ),
                });
            }
            row[col] = convert_json_value(row_num, &fields[col].name, types[col], jv)?;
        }
        rows.push(row);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: Option<DataType>,
    v: &serde_json::Value,
) -> OnboardingResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| OnboardingError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message,
    };

    let Some(data_type) = data_type else {
        return match v {
            serde_json::Value::String(s) if s.is_empty() => Ok(Value::Null),
            serde_json::Value::String(s) => Ok(Value::Utf8(s.clone())),
            other => Ok(Value::Utf8(other.to_string())),
        };
    };

    match data_type {
        DataType::Utf8 => match v.as_str() {
            Some("") => Ok(Value::Null),
            Some(s) => Ok(Value::Utf8(s.to_string())),
            None => Err(parse_error("expected string".to_string())),
        },
        DataType::Bool => v
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| parse_error("expected bool".to_string())),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = v.as_u64() {
                i64::try_from(n)
                    .map(Value::Int64)
                    .map_err(|_| parse_error("u64 out of range for i64".to_string()))
            } else {
                Err(parse_error("expected integer number".to_string()))
            }
        }
        DataType::Float64 => v
            .as_f64()
            .map(Value::Float64)
            .ok_or_else(|| parse_error("expected number".to_string())),
        DataType::Date => match v.as_str() {
            Some(s) => parse_date(s).map(Value::Date).map_err(parse_error),
            None => Err(parse_error("expected date string".to_string())),
        },
        DataType::DateTime => match v.as_str() {
            Some(s) => parse_datetime(s).map(Value::DateTime).map_err(parse_error),
            None => Err(parse_error("expected datetime string".to_string())),
        },
    }
}
