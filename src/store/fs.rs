use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use tracing::{debug, warn};

use crate::hashing::is_valid_hash;
use crate::model::{SavedQuery, SavedQuerySummary};

use super::{PutOutcome, QueryStore, StoreError, StoreResult};

/// File extension of committed records.
const RECORD_EXTENSION: &str = "json";
/// Extension of in-progress writes, never visible to readers.
const TEMP_EXTENSION: &str = "json.tmp";

/// Default capacity of the in-process read cache, in records.
pub const DEFAULT_READ_CACHE_CAPACITY: u64 = 1024;

/// Filesystem-backed query store: one JSON file per permalink hash under
/// a flat root directory.
///
/// Writes go to a temp file, are fsynced, then renamed into place, so a
/// record path either does not exist or holds a complete record. Because
/// records are write-once, the read-through cache can never go stale.
#[derive(Clone)]
pub struct FsQueryStore {
    root: PathBuf,
    read_cache: Cache<String, SavedQuery>,
}

impl FsQueryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_read_cache_capacity(root, DEFAULT_READ_CACHE_CAPACITY)
    }

    pub fn with_read_cache_capacity(root: impl Into<PathBuf>, capacity: u64) -> Self {
        Self {
            root: root.into(),
            read_cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn record_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.{RECORD_EXTENSION}"))
    }

    fn temp_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.{TEMP_EXTENSION}"))
    }

    fn write_record(
        root: &Path,
        final_path: &Path,
        temp_path: &Path,
        record: &SavedQuery,
    ) -> StoreResult<PutOutcome> {
        fs::create_dir_all(root)?;
        if final_path.exists() {
            return Ok(PutOutcome::AlreadyExists);
        }

        let encoded = serde_json::to_vec_pretty(record)?;
        let mut file = File::create(temp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        drop(file);
        fs::rename(temp_path, final_path)?;
        Ok(PutOutcome::Created)
    }

    fn load_record(path: &Path) -> StoreResult<Option<SavedQuery>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                // Tolerate damaged files rather than poisoning listings.
                warn!(path = %path.display(), error = %err, "Skipping unreadable query record");
                Ok(None)
            }
        }
    }

    fn list_records(root: &Path) -> StoreResult<Vec<(DateTime<Utc>, SavedQuery)>> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_record = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == RECORD_EXTENSION);
            if !is_record {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                && is_valid_hash(stem)
                && let Some(record) = Self::load_record(&path)?
            {
                records.push((record.created_at, record));
            }
        }
        Ok(records)
    }
}

impl fmt::Debug for FsQueryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsQueryStore")
            .field("root", &self.root)
            .field("cached_records", &self.read_cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl QueryStore for FsQueryStore {
    async fn exists(&self, hash: &str) -> StoreResult<bool> {
        if !is_valid_hash(hash) {
            return Ok(false);
        }
        if self.read_cache.contains_key(hash) {
            return Ok(true);
        }
        let path = self.record_path(hash);
        run_blocking(move || Ok(path.exists())).await
    }

    async fn get(&self, hash: &str) -> StoreResult<Option<SavedQuery>> {
        if !is_valid_hash(hash) {
            return Ok(None);
        }
        if let Some(record) = self.read_cache.get(hash) {
            return Ok(Some(record));
        }

        let path = self.record_path(hash);
        let record = run_blocking(move || Self::load_record(&path)).await?;
        if let Some(record) = &record {
            self.read_cache.insert(hash.to_string(), record.clone());
        }
        Ok(record)
    }

    async fn put(&self, record: &SavedQuery) -> StoreResult<PutOutcome> {
        if !is_valid_hash(&record.hash) {
            return Err(StoreError::Io {
                reason: format!(
                    "refusing to store record under invalid hash {:?}",
                    record.hash
                ),
            });
        }

        let root = self.root.clone();
        let final_path = self.record_path(&record.hash);
        let temp_path = self.temp_path(&record.hash);
        let to_write = record.clone();
        let outcome =
            run_blocking(move || Self::write_record(&root, &final_path, &temp_path, &to_write))
                .await?;

        if outcome == PutOutcome::Created {
            self.read_cache.insert(record.hash.clone(), record.clone());
            debug!(hash = %record.hash, "Persisted query record");
        }
        Ok(outcome)
    }

    async fn list(&self) -> StoreResult<Vec<SavedQuerySummary>> {
        let root = self.root.clone();
        let mut records = run_blocking(move || Self::list_records(&root)).await?;

        // Most recent first; hash breaks ties so the order is stable.
        records.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.hash.cmp(&b.1.hash)));
        Ok(records
            .into_iter()
            .map(|(_, record)| {
                let summary = record.summary();
                self.read_cache.insert(record.hash.clone(), record);
                summary
            })
            .collect())
    }
}

async fn run_blocking<T, F>(task: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| StoreError::Io {
            reason: format!("blocking store task failed: {err}"),
        })?
}
