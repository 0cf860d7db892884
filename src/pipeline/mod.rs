//! The highlight pipeline.
//!
//! A request flows from normalization through a cache check and then
//! either returns a persisted result or runs scoring, validation, and
//! persistence. Concurrent requests for the same permalink hash coalesce
//! onto a single oracle call, and a store that cannot persist degrades
//! to serving the unsaved result rather than failing the request.

mod error;
mod flight;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{Span, info, instrument, warn};

use crate::hashing::hash_of;
use crate::model::{HighlightResult, Query, SavedQuery, Sentence};
use crate::oracle::{OracleCredentials, OracleError, RelevanceOracle};
use crate::segment::split_sentences;
use crate::store::{PutOutcome, QueryStore};
use crate::validate::{ValidationError, parse_scores};

pub use error::HighlightError;
pub use flight::{FlightGroup, FlightRole};

/// Response header carrying the cache disposition of a request, or the
/// error code when it failed.
pub const STATUS_HEADER: &str = "X-Hilite-Status";

/// Status header value reported by the health probe.
pub const STATUS_HEALTHY: &str = "healthy";

/// How a highlight result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a previously persisted record.
    Hit,
    /// Computed fresh by this request.
    Miss,
    /// Joined a computation another request had already started.
    Coalesced,
}

impl CacheStatus {
    pub fn as_header_value(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Coalesced => "COALESCED",
        }
    }

    pub fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header_value())
    }
}

/// Retry budget for oracle unavailability.
///
/// Attempts beyond the first wait out an exponential backoff; other
/// oracle failures are terminal and never retried here.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the 1-based `attempt` failed.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.base_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

/// A highlight result plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOutcome {
    pub result: HighlightResult,
    pub status: CacheStatus,
}

/// Orchestrates normalization, cache lookup, scoring, validation, and
/// persistence for highlight requests.
pub struct HighlightPipeline<O, S> {
    oracle: Arc<O>,
    store: Arc<S>,
    retry: RetryPolicy,
    flight: FlightGroup<HighlightOutcome, HighlightError>,
}

impl<O, S> Clone for HighlightPipeline<O, S> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            store: Arc::clone(&self.store),
            retry: self.retry,
            flight: self.flight.clone(),
        }
    }
}

impl<O, S> HighlightPipeline<O, S>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    pub fn new(oracle: Arc<O>, store: Arc<S>) -> Self {
        Self::with_retry(oracle, store, RetryPolicy::default())
    }

    pub fn with_retry(oracle: Arc<O>, store: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            oracle,
            store,
            retry,
            flight: FlightGroup::new(),
        }
    }

    /// Runs one highlight request end to end.
    ///
    /// A persisted result is served as-is. Otherwise this request either
    /// starts the computation for its hash or joins one already in
    /// flight; every coalesced caller sees the same outcome. Failures
    /// are never persisted, so a failed hash stays free to retry.
    #[instrument(skip_all, fields(hash = tracing::field::Empty))]
    pub async fn highlight(
        &self,
        text: &str,
        question: &str,
        credentials: OracleCredentials,
    ) -> Result<HighlightOutcome, HighlightError> {
        let query = Query::normalized(text, question);
        if query.text.is_empty() {
            return Err(HighlightError::EmptyInput { field: "text" });
        }
        if query.question.is_empty() {
            return Err(HighlightError::EmptyInput { field: "question" });
        }

        let hash = hash_of(&query);
        Span::current().record("hash", hash.as_str());

        match self.store.get(&hash).await {
            Ok(Some(record)) => {
                info!(%hash, "Serving persisted highlight result");
                return Ok(HighlightOutcome {
                    result: record.result,
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => {}
            Err(err) => {
                // A broken store must not block scoring.
                warn!(%hash, error = %err, "Cache check failed; computing without it");
            }
        }

        let compute = Self::compute(
            Arc::clone(&self.oracle),
            Arc::clone(&self.store),
            self.retry,
            query,
            hash.clone(),
            credentials,
        );
        let (outcome, role) = self.flight.run(&hash, compute).await;
        let mut outcome = outcome.ok_or(HighlightError::FlightAborted)??;
        if role == FlightRole::Follower && outcome.status == CacheStatus::Miss {
            outcome.status = CacheStatus::Coalesced;
        }
        Ok(outcome)
    }

    /// The cache-miss path: score, validate, persist. Runs as a detached
    /// task so it outlives the caller that started it.
    async fn compute(
        oracle: Arc<O>,
        store: Arc<S>,
        retry: RetryPolicy,
        query: Query,
        hash: String,
        credentials: OracleCredentials,
    ) -> Result<HighlightOutcome, HighlightError> {
        // Double-check after winning the flight: the record may have
        // been committed between the caller's cache check and now.
        if let Ok(Some(record)) = store.get(&hash).await {
            return Ok(HighlightOutcome {
                result: record.result,
                status: CacheStatus::Hit,
            });
        }

        let sentences = split_sentences(&query.text);
        let mut validation_round = 0;
        let scores = loop {
            let raw = Self::score_with_retry(
                oracle.as_ref(),
                &retry,
                &sentences,
                &query.question,
                &credentials,
            )
            .await?;
            match parse_scores(&raw, &sentences) {
                Ok(scores) => break scores,
                Err(err) if validation_round == 0 => {
                    warn!(%hash, error = %err, "Oracle response failed validation; retrying once");
                    validation_round += 1;
                }
                Err(ValidationError::Unparseable { reason }) => {
                    return Err(HighlightError::Validation { reason });
                }
            }
        };

        let result = HighlightResult {
            sentences: scores,
            question: query.question.clone(),
            hash: hash.clone(),
        };
        let record = SavedQuery {
            hash: hash.clone(),
            query,
            result: result.clone(),
            created_at: Utc::now(),
        };

        match store.put(&record).await {
            Ok(PutOutcome::Created) => {
                info!(
                    %hash,
                    sentence_count = result.sentences.len(),
                    "Persisted new highlight result"
                );
            }
            Ok(PutOutcome::AlreadyExists) => {
                // Another writer committed first; its record is canonical.
                if let Ok(Some(existing)) = store.get(&hash).await {
                    return Ok(HighlightOutcome {
                        result: existing.result,
                        status: CacheStatus::Miss,
                    });
                }
            }
            Err(err) => {
                // Degraded mode: the result is served but not shareable.
                warn!(%hash, error = %err, "Failed to persist highlight result; serving unsaved");
            }
        }

        Ok(HighlightOutcome {
            result,
            status: CacheStatus::Miss,
        })
    }

    async fn score_with_retry(
        oracle: &O,
        retry: &RetryPolicy,
        sentences: &[Sentence],
        question: &str,
        credentials: &OracleCredentials,
    ) -> Result<String, HighlightError> {
        let attempts = retry.max_attempts.max(1);
        let mut last_reason = String::new();
        for attempt in 1..=attempts {
            match oracle.score(sentences, question, credentials).await {
                Ok(raw) => return Ok(raw),
                Err(OracleError::MissingCredentials) => {
                    return Err(HighlightError::InvalidCredentials {
                        reason: "no API key in request or server config".to_string(),
                    });
                }
                Err(OracleError::InvalidCredentials { reason }) => {
                    return Err(HighlightError::InvalidCredentials { reason });
                }
                Err(OracleError::Rejected { reason }) => {
                    return Err(HighlightError::OracleRejected { reason });
                }
                Err(OracleError::Unavailable { reason }) => {
                    warn!(attempt, attempts, %reason, "Oracle unavailable");
                    last_reason = reason;
                    if attempt < attempts {
                        tokio::time::sleep(retry.backoff_for(attempt)).await;
                    }
                }
            }
        }

        Err(HighlightError::OracleUnavailable {
            attempts,
            reason: last_reason,
        })
    }
}
