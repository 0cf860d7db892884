use std::fmt::Write;

use crate::model::Sentence;

/// Builds the scoring prompt sent to the oracle.
///
/// Sentences are listed under the same zero-based indices the reply must
/// echo back, so responses can be checked against the sentence list
/// without any positional guessing.
pub fn build_scoring_prompt(sentences: &[Sentence], question: &str) -> String {
    let mut numbered = String::new();
    for sentence in sentences {
        writeln!(numbered, "{}. {}", sentence.index, sentence.text)
            .expect("writing to a String cannot fail");
    }

    format!(
        "You are scoring sentences for relevance to a question.\n\
         \n\
         Question: {question}\n\
         \n\
         Sentences (numbered from 0):\n\
         {numbered}\n\
         Score every sentence for how relevant it is to the question:\n\
         - 1.0: directly answers the question\n\
         - 0.7: strongly related supporting information\n\
         - 0.4: somewhat related context\n\
         - 0.1: barely related\n\
         - 0.0: unrelated\n\
         \n\
         Respond with ONLY this JSON, no prose and no code fences:\n\
         {{\"scores\": [{{\"index\": 0, \"score\": 0.8, \"rationale\": \"brief reason\"}}, ...]}}\n\
         \n\
         Include ALL {count} sentences. Keep each rationale under one short sentence.",
        count = sentences.len(),
    )
}
