//! Display-name normalization.

use crate::context::PipelineContext;
use crate::error::OnboardingResult;
use crate::processing::schema::require_column;
use crate::types::{DataSet, Value};

/// Lowercase `s`, then upper-case the first letter of every word.
///
/// A word starts at an alphabetic character that does not follow a letter or digit, so
/// `"JEAN-LUC o'neil"` becomes `"Jean-Luc O'Neil"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alnum = false;
    for c in s.to_lowercase().chars() {
        if c.is_alphabetic() && !prev_alnum {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_alnum = c.is_alphanumeric();
    }
    out
}

/// Title-case every value of the configured display-name column.
///
/// Nulls and non-text values pass through unchanged.
pub fn normalize_names(ctx: &PipelineContext, dataset: &DataSet) -> OnboardingResult<DataSet> {
    let idx = require_column(dataset, &ctx.config.name_column)?;
    let data_type = dataset.schema.fields[idx].data_type;
    dataset.try_map_column(idx, data_type, |_, v| {
        Ok(match v {
            Value::Utf8(s) => Value::Utf8(title_case(s)),
            other => other.clone(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_names, title_case};
    use crate::config::PipelineConfig;
    use crate::context::PipelineContext;
    use crate::error::OnboardingError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    #[test]
    fn title_case_handles_mixed_input() {
        assert_eq!(title_case("bobby JacksOn"), "Bobby Jackson");
        assert_eq!(title_case("LESLIE TERRY"), "Leslie Terry");
        assert_eq!(title_case("jean-luc o'neil"), "Jean-Luc O'Neil");
        assert_eq!(title_case("  two  spaces "), "  Two  Spaces ");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn title_case_is_idempotent() {
        for s in ["mArY-anne SMITH", "élodie durand", "x2 y"] {
            let once = title_case(s);
            assert_eq!(title_case(&once), once);
        }
    }

    #[test]
    fn normalize_names_rewrites_only_the_name_column() {
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("name", DataType::Utf8),
                Field::new("hospital", DataType::Utf8),
            ]),
            vec![
                vec![Value::Utf8("bobby JACKSON".to_string()), Value::Utf8("sons and miller".to_string())],
                vec![Value::Null, Value::Utf8("x".to_string())],
            ],
        );
        let ctx = PipelineContext::new(PipelineConfig::default());

        let out = normalize_names(&ctx, &ds).unwrap();
        assert_eq!(out.rows[0][0], Value::Utf8("Bobby Jackson".to_string()));
        assert_eq!(out.rows[0][1], Value::Utf8("sons and miller".to_string()));
        assert_eq!(out.rows[1][0], Value::Null);
    }

    #[test]
    fn missing_name_column_is_a_schema_error() {
        let ds = DataSet::new(Schema::new(vec![Field::new("hospital", DataType::Utf8)]), vec![]);
        let ctx = PipelineContext::new(PipelineConfig::default());
        match normalize_names(&ctx, &ds) {
            Err(OnboardingError::Schema { missing }) => assert_eq!(missing, vec!["name"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
