//! Validation and repair of oracle scoring responses.
//!
//! The oracle is untrusted. Responses arrive wrapped in prose or code
//! fences, with duplicate or out-of-range indices, malformed entries, and
//! scores outside `[0.0, 1.0]`. This module repairs whatever it can and
//! fails only when no score payload is recoverable at all. Its output
//! always covers every expected sentence index exactly once, in order.

mod error;

use serde_json::Value;

use crate::model::{Sentence, SentenceScore};

pub use error::{ValidationError, ValidationResult};

/// Longest rationale kept after sanitization, in characters.
pub const MAX_RATIONALE_CHARS: usize = 512;

const MAX_REASON_CHARS: usize = 120;

/// Interprets a raw oracle response against the expected sentence list.
///
/// Repairs applied, in order:
/// - code fences and surrounding prose are stripped before parsing
/// - entries without a usable object shape or index (negative,
///   fractional, out of range) are dropped
/// - duplicate indices keep the first entry seen
/// - missing scores default to `0.0`, out-of-range scores are clamped
/// - rationales are trimmed, capped at [`MAX_RATIONALE_CHARS`] chars,
///   and dropped entirely when they contain control characters
/// - sentences the response never mentioned come back with score `0.0`
///   and no rationale
///
/// Fails only when no JSON can be recovered from the response.
pub fn parse_scores(
    raw: &str,
    sentences: &[Sentence],
) -> ValidationResult<Vec<SentenceScore>> {
    let payload = extract_json(raw)?;
    let entries = score_entries(&payload);

    let mut slots: Vec<Option<(f64, Option<String>)>> = vec![None; sentences.len()];
    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        let Some(index) = object.get("index").and_then(value_as_index) else {
            continue;
        };
        if index >= slots.len() {
            continue;
        }
        // First entry wins on duplicate indices.
        if slots[index].is_some() {
            continue;
        }

        let score = object
            .get("score")
            .and_then(Value::as_f64)
            .map_or(0.0, clamp_score);
        let rationale = object
            .get("rationale")
            .and_then(Value::as_str)
            .and_then(sanitize_rationale);
        slots[index] = Some((score, rationale));
    }

    Ok(sentences
        .iter()
        .zip(slots)
        .map(|(sentence, slot)| {
            let (score, rationale) = slot.unwrap_or((0.0, None));
            SentenceScore {
                index: sentence.index,
                text: sentence.text.clone(),
                score,
                rationale,
            }
        })
        .collect())
}

/// Recovers a JSON value from a response that may bury it in prose or
/// markdown code fences.
fn extract_json(raw: &str) -> ValidationResult<Value> {
    let trimmed = strip_code_fences(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    if let Some(candidate) = slice_between(trimmed, '{', '}')
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
    {
        return Ok(value);
    }
    if let Some(candidate) = slice_between(trimmed, '[', ']')
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
    {
        return Ok(value);
    }

    Err(ValidationError::Unparseable {
        reason: format!("no JSON found in response: {}", truncate_reason(raw)),
    })
}

/// Pulls the entry list out of the parsed payload. Accepts the documented
/// `{"scores": [...]}` shape or a bare top-level array.
fn score_entries(payload: &Value) -> &[Value] {
    match payload {
        Value::Object(map) => map
            .get("scores")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Value::Array(entries) => entries,
        _ => &[],
    }
}

/// Reads an entry index, tolerating JSON numbers that arrive as floats.
fn value_as_index(value: &Value) -> Option<usize> {
    if let Some(index) = value.as_u64() {
        return usize::try_from(index).ok();
    }
    let float = value.as_f64()?;
    (float >= 0.0 && float.fract() == 0.0 && float <= usize::MAX as f64)
        .then_some(float as usize)
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

fn sanitize_rationale(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return None;
    }
    Some(trimmed.chars().take(MAX_RATIONALE_CHARS).collect())
}

fn strip_code_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Widest slice from the first `open` to the last `close`, when both
/// exist in order.
fn slice_between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

fn truncate_reason(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX_REASON_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_REASON_CHARS).collect();
        format!("{head}...")
    }
}
