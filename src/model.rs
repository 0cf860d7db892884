//! Shared data model for highlight queries and persisted results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Max characters of source text carried in a listing preview.
pub const TEXT_PREVIEW_CHARS: usize = 100;

/// A normalized `(text, question)` pair.
///
/// Stored and hashed in normalized form: both fields trimmed at the edges,
/// interior whitespace untouched. Two requests that normalize to the same
/// `Query` share one permalink hash and one persisted result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub question: String,
}

impl Query {
    /// Builds the normalized form used for hashing and persistence.
    pub fn normalized(text: &str, question: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            question: question.trim().to_string(),
        }
    }

    /// Returns the leading slice of `text` used in listings.
    pub fn text_preview(&self) -> String {
        truncate_chars(&self.text, TEXT_PREVIEW_CHARS)
    }
}

/// One segmented sentence with its stable position in the source text.
///
/// Indices are zero-based, contiguous, and never change once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub index: usize,
    pub text: String,
}

/// Per-sentence relevance verdict from the scoring oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceScore {
    pub index: usize,
    pub text: String,
    /// Relevance in `[0.0, 1.0]`; higher means more relevant to the question.
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// The outbound payload of a highlight call.
///
/// `sentences` is complete and ordered by index ascending; `hash` is the
/// permalink token under which the result is (or will be) retrievable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightResult {
    pub sentences: Vec<SentenceScore>,
    pub question: String,
    pub hash: String,
}

/// Write-once persisted record, one per permalink hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub hash: String,
    pub query: Query,
    pub result: HighlightResult,
    pub created_at: DateTime<Utc>,
}

impl SavedQuery {
    /// Returns the listing row for this record.
    pub fn summary(&self) -> SavedQuerySummary {
        SavedQuerySummary {
            hash: self.hash.clone(),
            question: self.query.question.clone(),
            text_preview: self.query.text_preview(),
        }
    }
}

/// Listing row: enough to render a saved-query link, never the full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuerySummary {
    pub hash: String,
    pub question: String,
    pub text_preview: String,
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
