//! Column reductions for [`crate::types::DataSet`].

use crate::types::{DataSet, Value};

/// Built-in reduction operations over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count all rows (including nulls).
    Count,
    /// Count null values.
    NullCount,
    /// Minimum value, ignoring nulls.
    Min,
    /// Maximum value, ignoring nulls.
    Max,
}

/// Reduce a column using a built-in [`ReduceOp`].
///
/// - Returns `None` if `column` does not exist in the schema.
/// - `Count` and `NullCount` return `Value::Int64`.
/// - `Min`/`Max` compare numbers, dates and datetimes and return `Some(Value::Null)` if the
///   column has no non-null value of those kinds.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> Option<Value> {
    let idx = dataset.schema.index_of(column)?;

    match op {
        ReduceOp::Count => Some(Value::Int64(dataset.row_count() as i64)),
        ReduceOp::NullCount => {
            let nulls = dataset.column_values(idx).filter(|v| v.is_null()).count();
            Some(Value::Int64(nulls as i64))
        }
        ReduceOp::Min | ReduceOp::Max => {
            let keep_new = |acc: &Value, v: &Value| match compare(v, acc) {
                Some(ord) if op == ReduceOp::Min => ord.is_lt(),
                Some(ord) => ord.is_gt(),
                None => false,
            };

            let mut acc: Option<&Value> = None;
            for v in dataset.column_values(idx) {
                if !is_ordered_scalar(v) {
                    continue;
                }
                acc = match acc {
                    Some(a) if !keep_new(a, v) => Some(a),
                    _ => Some(v),
                };
            }
            Some(acc.cloned().unwrap_or(Value::Null))
        }
    }
}

fn is_ordered_scalar(v: &Value) -> bool {
    matches!(
        v,
        Value::Int64(_) | Value::Float64(_) | Value::Date(_) | Value::DateTime(_)
    )
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(y),
        (Value::Int64(x), Value::Float64(y)) => (*x as f64).partial_cmp(y),
        (Value::Float64(x), Value::Int64(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
