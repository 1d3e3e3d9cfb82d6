//! `data-onboarding` loads a tabular batch (CSV or JSON) into a document store after checking it
//! against a declared [`types::Schema`] and a set of integrity rules.
//!
//! The primary entrypoint is [`pipeline::run`], which reads the source named in a
//! [`config::PipelineConfig`], runs every validation stage, derives deterministic identifiers,
//! and inserts the batch inside one transaction whose document count must reconcile before it
//! commits.
//!
//! ## What a run does
//!
//! 1. **Ingest** the file into a [`types::DataSet`] ([`ingestion::ingest_from_path`]).
//! 2. **Validate**: column names are normalized (lowercase, spaces to `_`), required columns and
//!    nulls are checked, duplicated rows are reported and removed, sign-checked numeric columns
//!    are made non-negative, names are title-cased and admission/discharge dates are parsed and
//!    checked for order ([`processing`]).
//! 3. **Identify**: `patient_id` is the SHA-256 of the concatenated identity columns and `_id` is
//!    `<patient_id>-<admission date>` ([`processing::identity`]).
//! 4. **Load**: rows are inserted into the target collection and one metadata document into the
//!    metadata collection, or nothing at all ([`load::load_dataset`]).
//!
//! Every stage returns a typed [`OnboardingError`]. Progress and failures go to the
//! [`observability::LogSink`] carried by the [`context::PipelineContext`].
//!
//! ## Quick example: validate and load in memory
//!
//! ```rust
//! use data_onboarding::config::PipelineConfig;
//! use data_onboarding::context::PipelineContext;
//! use data_onboarding::load::{load_dataset, LoadTarget};
//! use data_onboarding::pipeline::process_dataset;
//! use data_onboarding::store::{DocumentStore, InMemoryStore};
//! use data_onboarding::types::{DataSet, DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), data_onboarding::OnboardingError> {
//! let config = PipelineConfig {
//!     required_columns: vec!["name".to_string(), "date_of_admission".to_string()],
//!     identity_columns: vec!["name".to_string()],
//!     sign_check_columns: vec![],
//!     ..PipelineConfig::default()
//! };
//! let ctx = PipelineContext::new(config);
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![
//!         Field::new("Name", DataType::Utf8),
//!         Field::new("Date of Admission", DataType::Utf8),
//!     ]),
//!     vec![
//!         vec![Value::Utf8("ada LOVELACE".to_string()), Value::Utf8("2024-01-05".to_string())],
//!         vec![Value::Utf8("alan turing".to_string()), Value::Utf8("2024-01-06".to_string())],
//!     ],
//! );
//!
//! let processed = process_dataset(&ctx, ds)?;
//! assert_eq!(processed.dataset.schema.fields[0].name, "_id");
//!
//! let store = InMemoryStore::new();
//! let report = load_dataset(&ctx, &processed.dataset, &store, &LoadTarget::from_config(&ctx.config))?;
//! assert_eq!(report.final_count, 2);
//! assert_eq!(store.count_documents("admissions_info")?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running from a config file
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use data_onboarding::config::PipelineConfig;
//! use data_onboarding::context::PipelineContext;
//! use data_onboarding::observability::StdErrSink;
//! use data_onboarding::store::FsStore;
//!
//! # fn main() -> Result<(), data_onboarding::OnboardingError> {
//! let config = PipelineConfig::from_json_path("onboarding.json")?;
//! let ctx = PipelineContext::new(config).with_sink(Arc::new(StdErrSink));
//! let summary = data_onboarding::pipeline::run(&ctx, &FsStore::new("./data/store"))?;
//! println!("inserted={}", summary.load.inserted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: CSV/JSON readers and the unified, format-inferring entrypoint
//! - [`types`]: schema and in-memory dataset types
//! - [`processing`]: validation, cleaning and identity stages
//! - [`load`]: count-reconciled transactional loading
//! - [`store`]: the document store boundary and its in-memory and filesystem implementations
//! - [`config`], [`context`]: run configuration and the context passed to every stage
//! - [`observability`]: log sinks
//! - [`pipeline`]: the end-to-end orchestration
//! - [`error`]: the error type shared by every stage

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod ingestion;
pub mod load;
pub mod observability;
pub mod pipeline;
pub mod processing;
pub mod store;
pub mod types;

pub use error::{OnboardingError, OnboardingResult};
