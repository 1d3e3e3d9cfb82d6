use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;

use data_onboarding::config::PipelineConfig;
use data_onboarding::context::PipelineContext;
use data_onboarding::load::{load_dataset, LoadTarget};
use data_onboarding::store::{Document, DocumentStore, InMemoryStore, Transaction};
use data_onboarding::types::{DataSet, DataType, Field, Schema, Value};
use data_onboarding::{OnboardingError, OnboardingResult};

/// Wraps an in-memory store and silently drops the last document of every batch insert.
#[derive(Default)]
struct LossyStore {
    inner: InMemoryStore,
    aborts: AtomicUsize,
}

struct LossyTransaction<'a> {
    inner: Box<dyn Transaction + 'a>,
    aborts: &'a AtomicUsize,
}

impl DocumentStore for LossyStore {
    fn ping(&self) -> OnboardingResult<()> {
        self.inner.ping()
    }

    fn begin_transaction(&self) -> OnboardingResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(LossyTransaction {
            inner: self.inner.begin_transaction()?,
            aborts: &self.aborts,
        }))
    }

    fn documents(&self, collection: &str) -> OnboardingResult<Vec<Document>> {
        self.inner.documents(collection)
    }
}

impl Transaction for LossyTransaction<'_> {
    fn count_documents(&mut self, collection: &str) -> OnboardingResult<u64> {
        self.inner.count_documents(collection)
    }

    fn insert_many(&mut self, collection: &str, mut documents: Vec<Document>) -> OnboardingResult<usize> {
        let acknowledged = documents.len();
        documents.pop();
        self.inner.insert_many(collection, documents)?;
        Ok(acknowledged)
    }

    fn commit(self: Box<Self>) -> OnboardingResult<()> {
        self.inner.commit()
    }

    fn abort(self: Box<Self>) -> OnboardingResult<()> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.inner.abort()
    }
}

/// Refuses every connection.
struct UnreachableStore;

impl DocumentStore for UnreachableStore {
    fn ping(&self) -> OnboardingResult<()> {
        Err(OnboardingError::Connection {
            message: "connection refused".to_string(),
        })
    }

    fn begin_transaction(&self) -> OnboardingResult<Box<dyn Transaction + '_>> {
        panic!("no transaction may start on an unreachable store")
    }

    fn documents(&self, _collection: &str) -> OnboardingResult<Vec<Document>> {
        Ok(Vec::new())
    }
}

fn dataset(rows: usize) -> DataSet {
    DataSet::new(
        Schema::new(vec![
            Field::new("_id", DataType::Utf8),
            Field::new("age", DataType::Int64),
        ]),
        (0..rows)
            .map(|i| vec![Value::Utf8(format!("p{i}-2024-01-01")), Value::Int64(20 + i as i64)])
            .collect(),
    )
}

fn ctx() -> PipelineContext {
    PipelineContext::new(PipelineConfig::default())
        .with_processing_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
}

fn target() -> LoadTarget {
    LoadTarget {
        collection: "admissions".to_string(),
        metadata_collection: "admissions_info".to_string(),
        source: "batch.csv".to_string(),
    }
}

#[test]
fn lost_row_fails_reconciliation_and_writes_nothing() {
    let store = LossyStore::default();

    match load_dataset(&ctx(), &dataset(3), &store, &target()) {
        Err(OnboardingError::CountMismatch { expected, actual }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected count mismatch, got {other:?}"),
    }

    assert_eq!(store.aborts.load(Ordering::SeqCst), 1);
    assert_eq!(store.count_documents("admissions").unwrap(), 0);
    assert_eq!(store.count_documents("admissions_info").unwrap(), 0);
}

#[test]
fn reconciliation_accounts_for_preexisting_documents() {
    let store = LossyStore::default();
    // Seed one committed document, bypassing the lossy wrapper.
    let mut txn = store.inner.begin_transaction().unwrap();
    txn.insert_many("admissions", vec![serde_json::json!({"_id": "old"}).as_object().unwrap().clone()])
        .unwrap();
    txn.commit().unwrap();

    match load_dataset(&ctx(), &dataset(2), &store, &target()) {
        Err(OnboardingError::CountMismatch { expected, actual }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected count mismatch, got {other:?}"),
    }
    assert_eq!(store.count_documents("admissions").unwrap(), 1);
}

#[test]
fn unreachable_store_fails_before_any_transaction() {
    let err = load_dataset(&ctx(), &dataset(1), &UnreachableStore, &target()).unwrap_err();
    assert!(matches!(err, OnboardingError::Connection { .. }));
    assert!(err.to_string().contains("connection refused"));
}
