//! Permalink hashing for normalized queries.
//!
//! A permalink token is the first 6 bytes (12 hex chars) of the BLAKE3
//! digest of the normalized text and question. The text is framed with a
//! length prefix so no `(text, question)` pair can collide with a
//! different split of the same concatenated bytes.

use std::fmt::Write;

use blake3::Hasher;

use crate::model::Query;

/// Length of a permalink token in hex characters.
pub const HASH_LEN: usize = 12;

/// Computes the permalink token for a normalized `(text, question)` pair.
///
/// Deterministic across processes and restarts: the same normalized inputs
/// always produce the same token. Callers pass already-normalized fields;
/// hashing does not trim again.
///
/// # Truncation Rationale
///
/// Six digest bytes give 48 bits of entropy. Tokens identify saved queries
/// in a single store that realistically holds thousands of records, far
/// below the birthday bound, and a collision would surface as a permalink
/// serving the earlier record rather than as data corruption.
#[inline]
pub fn hash_query(text: &str, question: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    hasher.update(question.as_bytes());
    let digest = hasher.finalize();

    let mut token = String::with_capacity(HASH_LEN);
    for byte in &digest.as_bytes()[..HASH_LEN / 2] {
        write!(token, "{byte:02x}").expect("writing to a String cannot fail");
    }
    token
}

/// Computes the permalink token for a [`Query`].
#[inline]
pub fn hash_of(query: &Query) -> String {
    hash_query(&query.text, &query.question)
}

/// Returns `true` if `token` has the exact shape of a permalink token:
/// [`HASH_LEN`] lowercase hex characters.
#[inline]
pub fn is_valid_hash(token: &str) -> bool {
    token.len() == HASH_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
