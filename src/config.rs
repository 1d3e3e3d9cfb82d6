//! Run configuration.
//!
//! A [`PipelineConfig`] is loaded once per run, either from a JSON file
//! ([`PipelineConfig::from_json_path`]) or from environment variables
//! ([`PipelineConfig::from_env`]), and is immutable afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OnboardingError, OnboardingResult};
use crate::types::{DataType, Field, Schema};

/// Mandatory environment variables, checked together so one error lists every missing one.
const REQUIRED_ENV_VARS: &[&str] = &[
    "FILE_PATH",
    "SCHEMA",
    "REQUIRED_COLUMNS",
    "PATIENT_ID_COLUMNS",
    "COLLECTION",
    "COLLECTION_INFO",
];

/// Everything a run needs besides the input data and the store handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input file.
    pub source: PathBuf,
    /// Column names and types the tabular source parses into.
    pub schema: Schema,
    /// Columns that must be present and non-null.
    pub required_columns: Vec<String>,
    /// Columns whose values, concatenated in order, define the entity identifier.
    #[serde(alias = "patient_id_columns")]
    pub identity_columns: Vec<String>,
    /// Numeric columns that must be strictly positive.
    pub sign_check_columns: Vec<String>,
    /// Replace non-positive values by their absolute value instead of failing.
    pub replace_negatives: bool,
    /// Display-name column to title-case.
    pub name_column: String,
    /// Admission date column.
    pub admission_column: String,
    /// Optional discharge date column.
    pub discharge_column: String,
    /// Name of the entity identifier column.
    pub entity_id_column: String,
    /// Name of the event identifier column.
    pub event_id_column: String,
    /// Primary collection receiving one document per row.
    pub collection: String,
    /// Collection receiving one metadata document per committed batch.
    pub metadata_collection: String,
    /// Root directory of the file-backed store.
    pub store_path: Option<PathBuf>,
    /// Directory for run log files.
    pub logging_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            schema: Schema::default(),
            required_columns: Vec::new(),
            identity_columns: Vec::new(),
            sign_check_columns: vec!["age".to_string(), "billing_amount".to_string()],
            replace_negatives: true,
            name_column: "name".to_string(),
            admission_column: "date_of_admission".to_string(),
            discharge_column: "discharge_date".to_string(),
            entity_id_column: "patient_id".to_string(),
            event_id_column: "_id".to_string(),
            collection: "admissions".to_string(),
            metadata_collection: "admissions_info".to_string(),
            store_path: None,
            logging_path: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_path(path: impl AsRef<Path>) -> OnboardingResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OnboardingError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment. See [`Self::from_env_vars`].
    pub fn from_env() -> OnboardingResult<Self> {
        Self::from_env_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs using the variable names of the onboarding job:
    ///
    /// - mandatory: `FILE_PATH`, `SCHEMA` (`name:type,...`), `REQUIRED_COLUMNS`,
    ///   `PATIENT_ID_COLUMNS`, `COLLECTION`, `COLLECTION_INFO`
    /// - optional: `SIGN_CHECK_COLUMNS`, `REPLACE_NEGATIVES`, `NAME_COLUMN`, `ADMISSION_COLUMN`,
    ///   `DISCHARGE_COLUMN`, `STORE_PATH`, `LOGGING_PATH`
    ///
    /// List values are comma separated; entries are trimmed and empty entries dropped.
    pub fn from_env_vars<I>(vars: I) -> OnboardingResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let missing: Vec<&str> = REQUIRED_ENV_VARS
            .iter()
            .copied()
            .filter(|k| !vars.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(OnboardingError::Config {
                message: format!("the following variables are missing: {missing:?}"),
            });
        }

        let defaults = Self::default();
        let text = |key: &str, default: String| vars.get(key).cloned().unwrap_or(default);
        let var = |key: &str| vars.get(key).map(String::as_str).unwrap_or_default();

        let config = Self {
            source: PathBuf::from(var("FILE_PATH")),
            schema: parse_schema(var("SCHEMA"))?,
            required_columns: split_list(var("REQUIRED_COLUMNS")),
            identity_columns: split_list(var("PATIENT_ID_COLUMNS")),
            sign_check_columns: match vars.get("SIGN_CHECK_COLUMNS") {
                Some(v) => split_list(v),
                None => defaults.sign_check_columns,
            },
            replace_negatives: match vars.get("REPLACE_NEGATIVES") {
                Some(v) => parse_flag("REPLACE_NEGATIVES", v)?,
                None => defaults.replace_negatives,
            },
            name_column: text("NAME_COLUMN", defaults.name_column),
            admission_column: text("ADMISSION_COLUMN", defaults.admission_column),
            discharge_column: text("DISCHARGE_COLUMN", defaults.discharge_column),
            entity_id_column: defaults.entity_id_column,
            event_id_column: defaults.event_id_column,
            collection: var("COLLECTION").to_string(),
            metadata_collection: var("COLLECTION_INFO").to_string(),
            store_path: vars.get("STORE_PATH").map(PathBuf::from),
            logging_path: vars.get("LOGGING_PATH").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings a run cannot do without are present.
    ///
    /// Reports every problem in one [`OnboardingError::Config`].
    pub fn validate(&self) -> OnboardingResult<()> {
        let mut problems = Vec::new();
        if self.source.as_os_str().is_empty() {
            problems.push("source is empty");
        }
        if self.schema.fields.is_empty() {
            problems.push("schema has no fields");
        }
        if self.identity_columns.is_empty() {
            problems.push("identity_columns is empty");
        }
        if self.collection.is_empty() {
            problems.push("collection is empty");
        }
        if self.metadata_collection.is_empty() {
            problems.push("metadata_collection is empty");
        }
        if !self.collection.is_empty() && self.collection == self.metadata_collection {
            problems.push("collection and metadata_collection must differ");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(OnboardingError::Config {
                message: problems.join("; "),
            })
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `name:type,name:type`.
fn parse_schema(raw: &str) -> OnboardingResult<Schema> {
    let mut fields = Vec::new();
    for entry in split_list(raw) {
        let (name, ty) = entry.split_once(':').ok_or_else(|| OnboardingError::Config {
            message: format!("schema entry '{entry}' must look like 'name:type'"),
        })?;
        let data_type = ty
            .parse::<DataType>()
            .map_err(|message| OnboardingError::Config { message })?;
        fields.push(Field::new(name.trim(), data_type));
    }
    Ok(Schema::new(fields))
}

fn parse_flag(key: &str, raw: &str) -> OnboardingResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(OnboardingError::Config {
            message: format!("{key} must be a boolean, got '{other}'"),
        }),
    }
}
