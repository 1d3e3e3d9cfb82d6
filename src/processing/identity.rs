//! Deterministic entity and event identifiers.
//!
//! The entity identifier is the lowercase hex SHA-256 digest of the identity columns' canonical
//! string forms ([`Value::render`]) concatenated in configured order without a separator. SHA-256
//! is stable across runs, platforms and toolchains, which the std `Hasher`s are not.

use sha2::{Digest, Sha256};

use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::processing::schema::normalize_column_name;
use crate::processing::temporal::parse_date;
use crate::types::{DataSet, DataType, Field, Value};

/// Lowercase hex SHA-256 digest of `input`.
pub fn hash_identity(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Event identifier for an entity admitted on `date` (`<entity>-YYYY-MM-DD`).
pub fn event_identifier(entity_id: &str, date: &Value) -> Option<String> {
    let day = match date {
        Value::Date(_) | Value::DateTime(_) => date.render()?,
        Value::Utf8(s) => parse_date(s).ok()?.format("%Y-%m-%d").to_string(),
        _ => return None,
    };
    Some(format!("{entity_id}-{}", day.get(..10)?))
}

/// Add the entity identifier as the leftmost column.
///
/// Fails with [`OnboardingError::IdentityComputation`] if an identity column is missing or a row
/// has a null identity value. An existing column with the identifier's name is replaced.
pub fn assign_entity_ids(ctx: &PipelineContext, dataset: DataSet) -> OnboardingResult<DataSet> {
    let target = normalize_column_name(&ctx.config.entity_id_column);
    let fail = |message: String| OnboardingError::IdentityComputation {
        target: target.clone(),
        message,
    };

    if ctx.config.identity_columns.is_empty() {
        return Err(fail("no identity columns configured".to_string()));
    }
    let mut idxs = Vec::with_capacity(ctx.config.identity_columns.len());
    for column in &ctx.config.identity_columns {
        let name = normalize_column_name(column);
        match dataset.schema.index_of(&name) {
            Some(idx) => idxs.push(idx),
            None => return Err(fail(format!("column '{name}' not found in dataset"))),
        }
    }

    let mut ids = Vec::with_capacity(dataset.row_count());
    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let mut key = String::new();
        for &idx in &idxs {
            match row[idx].render() {
                Some(part) => key.push_str(&part),
                None => {
                    return Err(fail(format!(
                        "null '{}' at row {}",
                        dataset.schema.fields[idx].name,
                        row_idx + 1
                    )));
                }
            }
        }
        ids.push(Value::Utf8(hash_identity(&key)));
    }

    let dataset = without_column(dataset, &target);
    Ok(dataset.with_leading_column(Field::new(target, DataType::Utf8), ids))
}

/// Add the event identifier as the leftmost column. Expects [`assign_entity_ids`] to have run.
pub fn assign_event_ids(ctx: &PipelineContext, dataset: DataSet) -> OnboardingResult<DataSet> {
    let target = normalize_column_name(&ctx.config.event_id_column);
    let entity = normalize_column_name(&ctx.config.entity_id_column);
    let admission = normalize_column_name(&ctx.config.admission_column);
    let fail = |message: String| OnboardingError::IdentityComputation {
        target: target.clone(),
        message,
    };

    let entity_idx = dataset
        .schema
        .index_of(&entity)
        .ok_or_else(|| fail(format!("column '{entity}' not found in dataset")))?;
    let admission_idx = dataset
        .schema
        .index_of(&admission)
        .ok_or_else(|| fail(format!("column '{admission}' not found in dataset")))?;

    let mut ids = Vec::with_capacity(dataset.row_count());
    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let Value::Utf8(entity_id) = &row[entity_idx] else {
            return Err(fail(format!("null '{entity}' at row {}", row_idx + 1)));
        };
        let id = event_identifier(entity_id, &row[admission_idx]).ok_or_else(|| {
            fail(format!(
                "'{admission}' at row {} is not a date: {}",
                row_idx + 1,
                row[admission_idx]
            ))
        })?;
        ids.push(Value::Utf8(id));
    }

    let dataset = without_column(dataset, &target);
    Ok(dataset.with_leading_column(Field::new(target, DataType::Utf8), ids))
}

/// Assign both identifiers. Resulting column order: event id, entity id, original columns.
pub fn assign_identifiers(ctx: &PipelineContext, dataset: DataSet) -> OnboardingResult<DataSet> {
    let dataset = assign_entity_ids(ctx, dataset)?;
    assign_event_ids(ctx, dataset)
}

fn without_column(dataset: DataSet, name: &str) -> DataSet {
    match dataset.schema.index_of(name) {
        Some(idx) => dataset.drop_column(idx),
        None => dataset,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::{assign_entity_ids, assign_identifiers, event_identifier, hash_identity};
    use crate::config::PipelineConfig;
    use crate::context::PipelineContext;
    use crate::error::OnboardingError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn ctx() -> PipelineContext {
        PipelineContext::new(PipelineConfig {
            identity_columns: vec!["name".to_string(), "age".to_string()],
            ..PipelineConfig::default()
        })
    }

    fn admitted(day: u32) -> Value {
        Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn dataset() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("name", DataType::Utf8),
                Field::new("age", DataType::Int64),
                Field::new("date_of_admission", DataType::DateTime),
            ]),
            vec![
                vec![Value::Utf8("Ada".to_string()), Value::Int64(36), admitted(10)],
                vec![Value::Utf8("Bob".to_string()), Value::Int64(50), admitted(11)],
                vec![Value::Utf8("Ada".to_string()), Value::Int64(36), admitted(20)],
            ],
        )
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_identity("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn identifiers_lead_in_the_expected_order() {
        let out = assign_identifiers(&ctx(), dataset()).unwrap();
        assert_eq!(
            out.schema.field_names().collect::<Vec<_>>(),
            vec!["_id", "patient_id", "name", "age", "date_of_admission"]
        );
    }

    #[test]
    fn equal_identity_values_share_an_entity_id() {
        let out = assign_identifiers(&ctx(), dataset()).unwrap();
        assert_eq!(out.rows[0][1], out.rows[2][1]);
        assert_ne!(out.rows[0][1], out.rows[1][1]);
        // Same entity, different admission day.
        assert_ne!(out.rows[0][0], out.rows[2][0]);

        let Value::Utf8(entity) = &out.rows[0][1] else { panic!("entity id must be text") };
        assert_eq!(entity, &hash_identity("Ada36"));
        assert_eq!(out.rows[0][0], Value::Utf8(format!("{entity}-2024-01-10")));
    }

    #[test]
    fn assignment_is_deterministic_and_rerunnable() {
        let first = assign_identifiers(&ctx(), dataset()).unwrap();
        let second = assign_identifiers(&ctx(), dataset()).unwrap();
        assert_eq!(first, second);

        // Re-running on already-identified data replaces the identifier columns in place.
        let rerun = assign_identifiers(&ctx(), first.clone()).unwrap();
        assert_eq!(rerun.column_count(), first.column_count());
        assert_eq!(rerun.rows, first.rows);
    }

    #[test]
    fn ten_thousand_distinct_patients_get_distinct_entity_ids() {
        let rows = (0..10_000)
            .map(|i| {
                vec![
                    Value::Utf8(format!("Patient {i}")),
                    Value::Int64(i % 90),
                    admitted((i % 28 + 1) as u32),
                ]
            })
            .collect();
        let ds = DataSet::new(dataset().schema, rows);

        let out = assign_entity_ids(&ctx(), ds).unwrap();
        assert_eq!(out.row_count(), 10_000);
        assert_eq!(out.rows[0][0], Value::Utf8(hash_identity("Patient 00")));
        assert_eq!(out.rows[9_999][0], Value::Utf8(hash_identity("Patient 99999")));

        let ids: HashSet<String> = out.column_values(0).filter_map(Value::render).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn event_identifier_accepts_dates_and_iso_text() {
        assert_eq!(event_identifier("abc", &admitted(5)).as_deref(), Some("abc-2024-01-05"));
        assert_eq!(
            event_identifier("abc", &Value::Utf8("2024-01-05 12:00:00".to_string())).as_deref(),
            Some("abc-2024-01-05")
        );
        assert_eq!(event_identifier("abc", &Value::Null), None);
        assert_eq!(event_identifier("abc", &Value::Int64(5)), None);
    }

    #[test]
    fn missing_identity_column_names_the_target() {
        let ctx = PipelineContext::new(PipelineConfig {
            identity_columns: vec!["name".to_string(), "gender".to_string()],
            ..PipelineConfig::default()
        });
        match assign_entity_ids(&ctx, dataset()) {
            Err(OnboardingError::IdentityComputation { target, message }) => {
                assert_eq!(target, "patient_id");
                assert!(message.contains("gender"));
            }
            other => panic!("expected identity error, got {other:?}"),
        }
    }

    #[test]
    fn null_admission_fails_the_event_id() {
        let mut ds = dataset();
        ds.rows[1][2] = Value::Null;
        match assign_identifiers(&ctx(), ds) {
            Err(OnboardingError::IdentityComputation { target, .. }) => assert_eq!(target, "_id"),
            other => panic!("expected identity error, got {other:?}"),
        }
    }
}
