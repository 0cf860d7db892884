use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::Sentence;

use super::{OracleCredentials, OracleError, RelevanceOracle};

/// Scripted oracle for tests.
///
/// Serves canned replies in order, repeating the last one once the
/// script runs out. Optionally delays each reply (for coalescing tests)
/// or demands a request key (for credential tests).
pub struct ScriptedOracle {
    replies: Mutex<Vec<Result<String, OracleError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    require_key: bool,
}

impl ScriptedOracle {
    /// Always replies with the same raw text.
    pub fn always(raw: impl Into<String>) -> Self {
        Self::with_replies(vec![Ok(raw.into())])
    }

    /// Replies in order, repeating the last entry once exhausted.
    pub fn with_replies(replies: Vec<Result<String, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            delay: None,
            require_key: false,
        }
    }

    /// Always replies with a well-formed scores payload for `scores`,
    /// indexed in order and without rationales.
    pub fn scoring(scores: &[f64]) -> Self {
        let entries: Vec<String> = scores
            .iter()
            .enumerate()
            .map(|(index, score)| format!(r#"{{"index": {index}, "score": {score}}}"#))
            .collect();
        Self::always(format!(r#"{{"scores": [{}]}}"#, entries.join(", ")))
    }

    /// Adds a fixed delay before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails with `MissingCredentials` unless the call presents a key.
    pub fn require_key(mut self) -> Self {
        self.require_key = true;
        self
    }

    /// Number of `score` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceOracle for ScriptedOracle {
    async fn score(
        &self,
        _sentences: &[Sentence],
        _question: &str,
        credentials: &OracleCredentials,
    ) -> Result<String, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.require_key && credentials.api_key().is_none() {
            return Err(OracleError::MissingCredentials);
        }

        let replies = self.replies.lock();
        replies
            .get(call)
            .or_else(|| replies.last())
            .cloned()
            .unwrap_or_else(|| {
                Err(OracleError::Unavailable {
                    reason: "scripted oracle has no replies".to_string(),
                })
            })
    }
}
