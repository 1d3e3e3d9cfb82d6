//! Validation, cleaning and identity stages.
//!
//! Every stage takes the [`crate::context::PipelineContext`] (configuration + log sink) and a
//! [`crate::types::DataSet`], and returns either a new dataset or a typed
//! [`crate::OnboardingError`]. [`crate::pipeline::process_dataset`] runs them in order:
//!
//! 1. [`schema::normalize_columns`] and [`schema::check_required_columns`]
//! 2. [`integrity::check_for_duplicates`] (non-fatal) and [`integrity::check_for_nulls`]
//! 3. [`sanitize::enforce_positive`]
//! 4. [`integrity::deduplicate`]
//! 5. [`names::normalize_names`]
//! 6. [`temporal::parse_dates`] and [`temporal::check_date_coherence`]
//! 7. [`identity::assign_identifiers`]
//!
//! ## Example: sign sanitation
//!
//! ```rust
//! use data_onboarding::config::PipelineConfig;
//! use data_onboarding::context::PipelineContext;
//! use data_onboarding::processing::sanitize::enforce_positive;
//! use data_onboarding::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let ctx = PipelineContext::new(PipelineConfig {
//!     sign_check_columns: vec!["age".to_string()],
//!     ..PipelineConfig::default()
//! });
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("age", DataType::Int64)]),
//!     vec![vec![Value::Int64(-5)], vec![Value::Int64(3)], vec![Value::Int64(-1)]],
//! );
//!
//! let (clean, corrected) = enforce_positive(&ctx, ds).unwrap();
//! assert_eq!(clean.rows, vec![vec![Value::Int64(5)], vec![Value::Int64(3)], vec![Value::Int64(1)]]);
//! assert_eq!(corrected, vec!["age"]);
//! ```

pub mod identity;
pub mod integrity;
pub mod names;
pub mod reduce;
pub mod sanitize;
pub mod schema;
pub mod temporal;

pub use reduce::{reduce, ReduceOp};
