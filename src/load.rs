//! Count-reconciled transactional loading.
//!
//! [`load_dataset`] inserts every row of a validated dataset as one batch, checks that the
//! collection grew by exactly the number of rows, and only then records a [`DatasetMetadata`]
//! document and commits. Any failure aborts the transaction, so neither rows nor metadata become
//! visible.

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{OnboardingError, OnboardingResult};
use crate::store::{Document, DocumentStore, TransactionGuard};
use crate::types::DataSet;

/// Where a batch goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    /// Collection receiving one document per row.
    pub collection: String,
    /// Collection receiving the batch metadata document.
    pub metadata_collection: String,
    /// Reference to the input, recorded in the metadata.
    pub source: String,
}

impl LoadTarget {
    /// Target described by a run configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            metadata_collection: config.metadata_collection.clone(),
            source: config.source.display().to_string(),
        }
    }
}

/// One record per committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Input reference.
    pub file: String,
    /// Rows inserted.
    pub row_count: usize,
    /// Columns per row document.
    pub column_count: usize,
    /// Processing date, `YYYY-MM-DD`.
    pub execution_date: String,
}

impl DatasetMetadata {
    /// Describe `dataset` loaded from `source` on `date`.
    pub fn describe(source: &str, dataset: &DataSet, date: chrono::NaiveDate) -> Self {
        Self {
            file: source.to_string(),
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            execution_date: date.format("%Y-%m-%d").to_string(),
        }
    }

    fn to_document(&self) -> OnboardingResult<Document> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(OnboardingError::Store {
                message: format!("metadata serialized to a non-object: {other}"),
            }),
        }
    }
}

/// Counts observed during a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Documents in the collection before insertion.
    pub initial_count: u64,
    /// Documents acknowledged by the batch insert.
    pub inserted: usize,
    /// Documents in the collection after insertion.
    pub final_count: u64,
    /// The metadata recorded for the batch.
    pub metadata: DatasetMetadata,
}

/// One JSON object per row, keys in column order.
pub fn to_documents(dataset: &DataSet) -> Vec<Document> {
    dataset
        .rows
        .iter()
        .map(|row| {
            dataset
                .schema
                .fields
                .iter()
                .zip(row)
                .map(|(field, value)| (field.name.clone(), value.to_json()))
                .collect()
        })
        .collect()
}

/// Insert `dataset` into `target.collection` and record its metadata, atomically.
///
/// Fails with:
///
/// - [`OnboardingError::Connection`] if the store does not answer a ping;
/// - [`OnboardingError::CountMismatch`] if the post-insert count is not the pre-insert count
///   plus the number of rows;
/// - whatever the store reports for rejected operations.
///
/// In every failure case the transaction is aborted.
pub fn load_dataset(
    ctx: &PipelineContext,
    dataset: &DataSet,
    store: &dyn DocumentStore,
    target: &LoadTarget,
) -> OnboardingResult<LoadReport> {
    let documents = to_documents(dataset);
    let row_count = documents.len();

    store.ping()?;
    ctx.sink.info("established connection to store");

    let mut txn = TransactionGuard::begin(store)?;

    let initial_count = txn.count_documents(&target.collection)?;
    ctx.sink.info(&format!(
        "initial count of documents in '{}': {initial_count}",
        target.collection
    ));
    ctx.sink.info(&format!("number of documents to insert: {row_count}"));

    let inserted = txn.insert_many(&target.collection, documents)?;

    let expected = initial_count + row_count as u64;
    let final_count = txn.count_documents(&target.collection)?;
    if final_count != expected {
        if let Err(e) = txn.abort() {
            ctx.sink.error(&format!("abort after count mismatch failed: {e}"));
        }
        return Err(OnboardingError::CountMismatch {
            expected,
            actual: final_count,
        });
    }
    ctx.sink.info(&format!(
        "correct number of documents after insertion: {final_count}"
    ));

    let metadata = DatasetMetadata::describe(&target.source, dataset, ctx.processing_date());
    txn.insert_one(&target.metadata_collection, metadata.to_document()?)?;
    txn.commit()?;
    ctx.sink.info(&format!(
        "committed {row_count} documents to '{}' and metadata to '{}'",
        target.collection, target.metadata_collection
    ));

    Ok(LoadReport {
        initial_count,
        inserted,
        final_count,
        metadata,
    })
}
