//! Sign constraints on numeric columns.

use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::reduce::{reduce, ReduceOp};
use crate::processing::schema::normalize_column_name;
use crate::types::{DataSet, Value};

/// Enforce strictly positive values on the configured sign-check columns.
///
/// Every configured column must exist and be numeric; the first one that does not aborts the
/// whole step with [`OnboardingError::Config`] before anything is rewritten. For each column
/// whose minimum is `<= 0`:
///
/// - with `replace_negatives`, every value is replaced by its absolute value and a warning is
///   logged;
/// - otherwise the step fails with [`OnboardingError::Value`] naming the first such column.
///
/// Returns the sanitized dataset and the names of the corrected columns.
pub fn enforce_positive(
    ctx: &PipelineContext,
    dataset: DataSet,
) -> OnboardingResult<(DataSet, Vec<String>)> {
    let mut targets = Vec::with_capacity(ctx.config.sign_check_columns.len());
    for column in &ctx.config.sign_check_columns {
        let name = normalize_column_name(column);
        let idx = dataset.schema.index_of(&name).ok_or_else(|| OnboardingError::Config {
            message: format!("sign check column '{name}' not found in dataset"),
        })?;
        let data_type = dataset.schema.fields[idx].data_type;
        if !data_type.is_numeric() {
            return Err(OnboardingError::Config {
                message: format!("sign check column '{name}' is {data_type:?}, expected a number"),
            });
        }
        targets.push((name, idx));
    }

    let mut dataset = dataset;
    let mut corrected = Vec::new();
    for (name, idx) in targets {
        let has_non_positive = match reduce(&dataset, &name, ReduceOp::Min) {
            Some(Value::Int64(min)) => min <= 0,
            Some(Value::Float64(min)) => min <= 0.0,
            _ => false,
        };
        if !has_non_positive {
            continue;
        }

        if !ctx.config.replace_negatives {
            return Err(OnboardingError::Value { column: name });
        }

        ctx.sink.warn(&format!(
            "column '{name}' contains zero or negative values, replacing with absolute values"
        ));
        let data_type = dataset.schema.fields[idx].data_type;
        dataset = dataset.try_map_column(idx, data_type, |_, v| absolute(&name, v))?;
        corrected.push(name);
    }

    Ok((dataset, corrected))
}

fn absolute(column: &str, v: &Value) -> OnboardingResult<Value> {
    match v {
        Value::Int64(n) => n.checked_abs().map(Value::Int64).ok_or_else(|| OnboardingError::Value {
            column: column.to_string(),
        }),
        Value::Float64(f) => Ok(Value::Float64(f.abs())),
        other => Ok(other.clone()),
    }
}
