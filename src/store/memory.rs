use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::hashing::is_valid_hash;
use crate::model::{SavedQuery, SavedQuerySummary};

use super::{PutOutcome, QueryStore, StoreError, StoreResult};

/// In-memory store for tests.
///
/// Mirrors `FsQueryStore` semantics (write-once, hash validity) and adds
/// failure injection for exercising degraded paths.
#[derive(Debug, Default)]
pub struct MemoryQueryStore {
    records: Arc<RwLock<HashMap<String, SavedQuery>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `put` calls fail, exercising degraded persistence.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `exists`/`get`/`list` calls fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                reason: "injected read failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QueryStore for MemoryQueryStore {
    async fn exists(&self, hash: &str) -> StoreResult<bool> {
        self.check_reads()?;
        Ok(is_valid_hash(hash)
            && self
                .records
                .read()
                .expect("lock poisoned")
                .contains_key(hash))
    }

    async fn get(&self, hash: &str) -> StoreResult<Option<SavedQuery>> {
        self.check_reads()?;
        if !is_valid_hash(hash) {
            return Ok(None);
        }
        Ok(self.records.read().expect("lock poisoned").get(hash).cloned())
    }

    async fn put(&self, record: &SavedQuery) -> StoreResult<PutOutcome> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                reason: "injected write failure".to_string(),
            });
        }
        if !is_valid_hash(&record.hash) {
            return Err(StoreError::Io {
                reason: format!(
                    "refusing to store record under invalid hash {:?}",
                    record.hash
                ),
            });
        }

        let mut records = self.records.write().expect("lock poisoned");
        if records.contains_key(&record.hash) {
            return Ok(PutOutcome::AlreadyExists);
        }
        records.insert(record.hash.clone(), record.clone());
        Ok(PutOutcome::Created)
    }

    async fn list(&self) -> StoreResult<Vec<SavedQuerySummary>> {
        self.check_reads()?;
        let records = self.records.read().expect("lock poisoned");
        let mut rows: Vec<_> = records.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        Ok(rows.into_iter().map(|record| record.summary()).collect())
    }
}
