//! The relevance oracle boundary.
//!
//! An oracle scores segmented sentences against a question and replies
//! with raw text. The production oracle is Google's Gemini API; tests
//! script their own. Raw replies always pass through `validate` before
//! anything downstream trusts them.

mod error;
mod gemini;
mod prompt;
#[cfg(any(test, feature = "mock"))]
mod scripted;

use std::fmt;

use async_trait::async_trait;

use crate::model::Sentence;

pub use error::OracleError;
pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiOracle, GeminiOracleConfig};
pub use prompt::build_scoring_prompt;
#[cfg(any(test, feature = "mock"))]
pub use scripted::ScriptedOracle;

/// Per-request oracle credentials.
///
/// Carried alongside a single call and dropped with it. Request keys are
/// never persisted and never logged; `Debug` redacts them.
#[derive(Clone, Default)]
pub struct OracleCredentials {
    api_key: Option<String>,
}

impl OracleCredentials {
    /// Builds credentials from an optional request-supplied key. Blank
    /// keys count as absent.
    pub fn from_request_key(key: Option<String>) -> Self {
        Self {
            api_key: key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for OracleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Scores sentences for relevance to a question.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Returns the oracle's raw textual reply for the given sentences
    /// and question. Implementations only transport the reply; callers
    /// validate it.
    async fn score(
        &self,
        sentences: &[Sentence],
        question: &str,
        credentials: &OracleCredentials,
    ) -> Result<String, OracleError>;
}
