use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Document, DocumentStore, StagedWrites, Transaction};
use crate::error::{OnboardingError, OnboardingResult};

/// Collections held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> OnboardingResult<MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections.lock().map_err(|_| OnboardingError::Store {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

impl DocumentStore for InMemoryStore {
    fn ping(&self) -> OnboardingResult<()> {
        self.lock().map(|_| ()).map_err(|e| OnboardingError::Connection {
            message: e.to_string(),
        })
    }

    fn begin_transaction(&self) -> OnboardingResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            store: self,
            staged: StagedWrites::default(),
        }))
    }

    fn documents(&self, collection: &str) -> OnboardingResult<Vec<Document>> {
        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }
}

struct MemoryTransaction<'a> {
    store: &'a InMemoryStore,
    staged: StagedWrites,
}

impl Transaction for MemoryTransaction<'_> {
    fn count_documents(&mut self, collection: &str) -> OnboardingResult<u64> {
        let committed = self.store.lock()?.get(collection).map_or(0, Vec::len) as u64;
        Ok(committed + self.staged.staged_len(collection))
    }

    fn insert_many(&mut self, collection: &str, documents: Vec<Document>) -> OnboardingResult<usize> {
        let guard = self.store.lock()?;
        let committed = guard.get(collection).map(Vec::as_slice).unwrap_or_default();
        self.staged.stage(collection, documents, committed)
    }

    fn commit(self: Box<Self>) -> OnboardingResult<()> {
        let MemoryTransaction { store, staged } = *self;
        let mut guard = store.lock()?;
        for (collection, docs) in staged.into_inner() {
            guard.entry(collection).or_default().extend(docs);
        }
        Ok(())
    }

    fn abort(self: Box<Self>) -> OnboardingResult<()> {
        Ok(())
    }
}
