//! Document store boundary.
//!
//! The loader needs very little from a store: a reachability check, document counts, batch and
//! single inserts, and a transaction that either commits everything or nothing. [`DocumentStore`]
//! and [`Transaction`] capture exactly that; [`TransactionGuard`] makes sure a transaction that
//! is not committed is aborted on every exit path.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryStore`]: mutex-guarded collections, for tests and embedding
//! - [`FsStore`]: one NDJSON file per collection, committed by switching generations

mod fs;
mod memory;

use std::collections::{BTreeMap, HashSet};

pub use fs::FsStore;
pub use memory::InMemoryStore;

use crate::error::{OnboardingError, OnboardingResult};

/// One stored record.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Key enforced unique within a collection, like a primary key.
pub const ID_FIELD: &str = "_id";

/// A store holding named collections of documents.
pub trait DocumentStore: Send + Sync {
    /// Check that the store is reachable. Fails with [`OnboardingError::Connection`].
    fn ping(&self) -> OnboardingResult<()>;

    /// Open a transaction. Writes are invisible to other readers until commit.
    fn begin_transaction(&self) -> OnboardingResult<Box<dyn Transaction + '_>>;

    /// Committed documents of a collection, in insertion order. Unknown collections are empty.
    fn documents(&self, collection: &str) -> OnboardingResult<Vec<Document>>;

    /// Number of committed documents in a collection.
    fn count_documents(&self, collection: &str) -> OnboardingResult<u64> {
        Ok(self.documents(collection)?.len() as u64)
    }
}

/// A unit of work against a [`DocumentStore`].
///
/// Reads inside the transaction see its own uncommitted writes.
pub trait Transaction {
    /// Number of documents in `collection`, including writes staged by this transaction.
    fn count_documents(&mut self, collection: &str) -> OnboardingResult<u64>;

    /// Insert a batch; returns the number of documents acknowledged.
    fn insert_many(&mut self, collection: &str, documents: Vec<Document>) -> OnboardingResult<usize>;

    /// Insert a single document.
    fn insert_one(&mut self, collection: &str, document: Document) -> OnboardingResult<()> {
        self.insert_many(collection, vec![document]).map(|_| ())
    }

    /// Make every staged write visible.
    fn commit(self: Box<Self>) -> OnboardingResult<()>;

    /// Discard every staged write.
    fn abort(self: Box<Self>) -> OnboardingResult<()>;
}

/// Owns an open transaction and aborts it on drop unless [`Self::commit`] was called.
pub struct TransactionGuard<'a> {
    txn: Option<Box<dyn Transaction + 'a>>,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a transaction on `store` and guard it.
    pub fn begin(store: &'a dyn DocumentStore) -> OnboardingResult<Self> {
        Ok(Self {
            txn: Some(store.begin_transaction()?),
        })
    }

    fn txn(&mut self) -> OnboardingResult<&mut (dyn Transaction + 'a)> {
        self.txn.as_deref_mut().ok_or_else(|| OnboardingError::Store {
            message: "transaction already finished".to_string(),
        })
    }

    /// See [`Transaction::count_documents`].
    pub fn count_documents(&mut self, collection: &str) -> OnboardingResult<u64> {
        self.txn()?.count_documents(collection)
    }

    /// See [`Transaction::insert_many`].
    pub fn insert_many(&mut self, collection: &str, documents: Vec<Document>) -> OnboardingResult<usize> {
        self.txn()?.insert_many(collection, documents)
    }

    /// See [`Transaction::insert_one`].
    pub fn insert_one(&mut self, collection: &str, document: Document) -> OnboardingResult<()> {
        self.txn()?.insert_one(collection, document)
    }

    /// Commit and release the transaction.
    pub fn commit(mut self) -> OnboardingResult<()> {
        match self.txn.take() {
            Some(txn) => txn.commit(),
            None => Err(OnboardingError::Store {
                message: "transaction already finished".to_string(),
            }),
        }
    }

    /// Abort explicitly, surfacing an abort failure instead of swallowing it on drop.
    pub fn abort(mut self) -> OnboardingResult<()> {
        match self.txn.take() {
            Some(txn) => txn.abort(),
            None => Ok(()),
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            let _ = txn.abort();
        }
    }
}

/// Writes staged by an open transaction, grouped by collection.
#[derive(Debug, Default)]
pub(crate) struct StagedWrites {
    collections: BTreeMap<String, Vec<Document>>,
}

impl StagedWrites {
    pub(crate) fn staged_len(&self, collection: &str) -> u64 {
        self.collections.get(collection).map_or(0, |docs| docs.len() as u64)
    }

    /// Stage `documents`, rejecting any `_id` already used in `committed`, in earlier staged
    /// writes, or twice in the batch itself. A rejected batch stages nothing.
    pub(crate) fn stage(
        &mut self,
        collection: &str,
        documents: Vec<Document>,
        committed: &[Document],
    ) -> OnboardingResult<usize> {
        let staged = self.collections.get(collection).map(Vec::as_slice).unwrap_or_default();
        let mut ids: HashSet<String> = committed
            .iter()
            .chain(staged)
            .filter_map(|d| d.get(ID_FIELD))
            .map(|id| id.to_string())
            .collect();

        for doc in &documents {
            if let Some(id) = doc.get(ID_FIELD) {
                if !ids.insert(id.to_string()) {
                    return Err(OnboardingError::Store {
                        message: format!("duplicate key in collection '{collection}': {ID_FIELD}={id}"),
                    });
                }
            }
        }

        let n = documents.len();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(n)
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, Vec<Document>> {
        self.collections
    }
}
