//! Tabular sources.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - fails with [`crate::OnboardingError::NotFound`] when the input does not exist
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - reads the input into an in-memory [`crate::types::DataSet`]
//! - optionally reports success/failure/alerts to a [`crate::observability::LogSink`]
//!
//! Format-specific functions are also available under [`csv`] and [`json`].

pub mod csv;
pub mod json;
pub mod unified;

pub use unified::{ingest_from_path, IngestionFormat, IngestionOptions};
