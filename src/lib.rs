//! Hilite library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! The exports are organized by module:
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`Query`], [`HighlightResult`], [`SavedQuery`] - Domain model
//! - [`HighlightPipeline`], [`CacheStatus`] - Request orchestration
//!
//! ## Oracle
//! - [`RelevanceOracle`] - Scoring backend trait
//! - [`GeminiOracle`], [`GeminiOracleConfig`] - Gemini-backed implementation
//! - [`OracleCredentials`] - Per-request key resolution
//!
//! ## Persistence
//! - [`QueryStore`] - Write-once record store trait
//! - [`FsQueryStore`] - Filesystem implementation with read-through cache
//!
//! ## Utilities
//! - Sentence segmentation, content hashing, and oracle response
//!   validation are exposed for direct use in tests and tooling.
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod gateway;
pub mod hashing;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod segment;
pub mod store;
pub mod validate;

pub use config::{Config, ConfigError};
pub use gateway::{
    API_KEY_HEADER, ErrorResponse, GatewayError, GatewayState, HealthResponse, HighlightRequest,
    SavedListResponse, SavedQueryResponse, create_router_with_state,
};
pub use hashing::{HASH_LEN, hash_of, hash_query, is_valid_hash};
pub use model::{
    HighlightResult, Query, SavedQuery, SavedQuerySummary, Sentence, SentenceScore,
    TEXT_PREVIEW_CHARS,
};
pub use oracle::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiOracle, GeminiOracleConfig, OracleCredentials,
    OracleError, RelevanceOracle, build_scoring_prompt,
};
#[cfg(any(test, feature = "mock"))]
pub use oracle::ScriptedOracle;
pub use pipeline::{
    CacheStatus, FlightGroup, FlightRole, HighlightError, HighlightOutcome, HighlightPipeline,
    RetryPolicy, STATUS_HEADER, STATUS_HEALTHY,
};
pub use segment::split_sentences;
#[cfg(any(test, feature = "mock"))]
pub use store::MemoryQueryStore;
pub use store::{FsQueryStore, PutOutcome, QueryStore, StoreError};
pub use validate::{ValidationError, parse_scores};
