//! Write-once persistence for highlight results.
//!
//! Every committed record is keyed by its permalink hash and never
//! changes afterwards. That single invariant is what makes permalinks
//! stable, re-computation unnecessary, and read caching trivially safe.

mod error;
mod fs;
#[cfg(any(test, feature = "mock"))]
mod memory;

use async_trait::async_trait;

use crate::model::{SavedQuery, SavedQuerySummary};

pub use error::{StoreError, StoreResult};
pub use fs::{DEFAULT_READ_CACHE_CAPACITY, FsQueryStore};
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryQueryStore;

/// Result of a [`QueryStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record was committed by this call.
    Created,
    /// A record for this hash was already committed; nothing was written.
    AlreadyExists,
}

/// Persistent, write-once storage of highlight results keyed by
/// permalink hash.
///
/// Implementations must be shareable across tasks and must never expose
/// a partially written record: `get` returns a complete record or
/// nothing.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Returns whether a committed record exists for `hash`.
    async fn exists(&self, hash: &str) -> StoreResult<bool>;

    /// Fetches the record for `hash`, or `None` if absent. Tokens that
    /// are not well-formed permalink hashes are absent by definition.
    async fn get(&self, hash: &str) -> StoreResult<Option<SavedQuery>>;

    /// Commits `record` under its hash. A later put for an already
    /// committed hash writes nothing and reports
    /// [`PutOutcome::AlreadyExists`].
    async fn put(&self, record: &SavedQuery) -> StoreResult<PutOutcome>;

    /// Lists all committed records, most recent first.
    async fn list(&self) -> StoreResult<Vec<SavedQuerySummary>>;
}
