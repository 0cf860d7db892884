//! Deterministic sentence segmentation.
//!
//! Splits free text into sentences on terminal punctuation (`.`, `!`, `?`)
//! followed by whitespace or end of input. A lone `.` is not a boundary
//! when the preceding word is a known abbreviation or a single-letter
//! initial, and a `.` inside a number never ends a sentence because a
//! digit follows it directly. Whitespace inside a sentence is preserved
//! exactly as written; only the whitespace between sentences is dropped.
//!
//! The same input always yields the same sentences with the same indices,
//! which keeps permalink hashes and stored results stable.


use crate::model::Sentence;

/// Words whose trailing dot does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g",
    "i.e", "inc", "ltd", "co", "corp", "dept", "fig", "al", "no", "vol",
    "approx",
];

/// Splits `text` into indexed sentences.
///
/// Indices are zero-based and contiguous. Empty or whitespace-only input
/// yields no sentences.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }

        // Consume the whole terminal run ("...", "?!", "!!").
        let run_start = i;
        while i + 1 < chars.len() && is_terminal(chars[i + 1].1) {
            i += 1;
        }

        // A boundary needs whitespace or end of input after the run.
        let next = chars.get(i + 1).map(|&(_, c)| c);
        if !next.is_none_or(char::is_whitespace) {
            i += 1;
            continue;
        }

        // A lone '.' may close an abbreviation or an initial instead of
        // a sentence.
        if i == run_start
            && chars[run_start].1 == '.'
            && is_guarded_dot(&text[start..chars[run_start].0])
        {
            i += 1;
            continue;
        }

        let end = chars.get(i + 1).map_or(text.len(), |&(offset, _)| offset);
        push_sentence(&mut sentences, &text[start..end]);

        i += 1;
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        start = chars.get(i).map_or(text.len(), |&(offset, _)| offset);
    }

    if start < text.len() {
        push_sentence(&mut sentences, &text[start..]);
    }

    sentences
}

#[inline]
fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Returns `true` if the word just before a lone `.` marks it as an
/// abbreviation dot rather than a sentence end.
fn is_guarded_dot(preceding: &str) -> bool {
    let Some(word) = preceding.split_whitespace().next_back() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }

    // A single letter reads as an initial ("J. K. Rowling").
    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next())
        && first.is_alphabetic()
    {
        return true;
    }

    let lowered = word.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

fn push_sentence(sentences: &mut Vec<Sentence>, raw: &str) {
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    sentences.push(Sentence {
        index: sentences.len(),
        text: text.to_string(),
    });
}
