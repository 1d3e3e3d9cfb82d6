//! Column-name normalization and required-column presence.

use std::collections::HashSet;

use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::types::{DataSet, DataType, Field, Schema};

/// Canonical column name: lowercase, spaces replaced by underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Type the schema declares for `column`, matched by canonical name.
pub fn declared_type(schema: &Schema, column: &str) -> Option<DataType> {
    let wanted = normalize_column_name(column);
    schema
        .fields
        .iter()
        .find(|f| normalize_column_name(&f.name) == wanted)
        .map(|f| f.data_type)
}

/// Rename every column to its canonical name.
///
/// Fails with [`OnboardingError::SchemaMismatch`] if two columns collapse onto the same name.
pub fn normalize_columns(dataset: DataSet) -> OnboardingResult<DataSet> {
    let mut seen = HashSet::with_capacity(dataset.column_count());
    let mut fields = Vec::with_capacity(dataset.column_count());
    for field in &dataset.schema.fields {
        let name = normalize_column_name(&field.name);
        if !seen.insert(name.clone()) {
            return Err(OnboardingError::SchemaMismatch {
                message: format!("column '{}' collides with another column as '{name}'", field.name),
            });
        }
        fields.push(Field::new(name, field.data_type));
    }

    Ok(DataSet::new(Schema::new(fields), dataset.rows))
}

/// Required columns absent from `dataset`, in the order they were required.
pub fn missing_columns(dataset: &DataSet, required: &[String]) -> Vec<String> {
    required
        .iter()
        .map(|c| normalize_column_name(c))
        .filter(|c| !dataset.schema.contains(c))
        .collect()
}

/// Fail with [`OnboardingError::Schema`] naming every required column the dataset lacks.
pub fn check_required_columns(ctx: &PipelineContext, dataset: &DataSet) -> OnboardingResult<()> {
    let required = &ctx.config.required_columns;
    let missing = missing_columns(dataset, required);
    if !missing.is_empty() {
        return Err(OnboardingError::Schema { missing });
    }

    ctx.sink.info(&format!("{required:?} present in dataset"));
    Ok(())
}

/// Index of a column the caller relies on, or [`OnboardingError::Schema`] naming it.
pub fn require_column(dataset: &DataSet, name: &str) -> OnboardingResult<usize> {
    let name = normalize_column_name(name);
    dataset
        .schema
        .index_of(&name)
        .ok_or(OnboardingError::Schema {
            missing: vec![name],
        })
}
