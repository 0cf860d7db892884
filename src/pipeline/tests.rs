use super::*;

use crate::oracle::ScriptedOracle;
use crate::store::MemoryQueryStore;

type TestPipeline = HighlightPipeline<ScriptedOracle, MemoryQueryStore>;

fn build_pipeline(
    oracle: ScriptedOracle,
) -> (TestPipeline, Arc<ScriptedOracle>, Arc<MemoryQueryStore>) {
    let oracle = Arc::new(oracle);
    let store = Arc::new(MemoryQueryStore::new());
    let pipeline = HighlightPipeline::new(Arc::clone(&oracle), Arc::clone(&store));
    (pipeline, oracle, store)
}

#[tokio::test]
async fn test_scores_land_on_the_right_sentences() {
    let (pipeline, _oracle, _store) = build_pipeline(ScriptedOracle::scoring(&[0.1, 0.9, 0.1]));

    let outcome = pipeline
        .highlight(
            "Cats sleep all day. Dogs bark loudly. Fish swim in tanks.",
            "Which animal makes noise?",
            OracleCredentials::default(),
        )
        .await
        .expect("highlight");

    assert_eq!(outcome.status, CacheStatus::Miss);
    let result = outcome.result;
    assert_eq!(result.hash.len(), 12);
    assert_eq!(result.question, "Which animal makes noise?");
    assert_eq!(result.sentences.len(), 3);
    assert_eq!(result.sentences[1].text, "Dogs bark loudly.");
    assert_eq!(result.sentences[1].score, 0.9);
    assert_eq!(result.sentences[0].score, 0.1);
    assert_eq!(result.sentences[2].score, 0.1);
}

#[tokio::test]
async fn test_repeat_request_is_served_from_store() {
    let (pipeline, oracle, store) = build_pipeline(ScriptedOracle::scoring(&[0.5]));

    let first = pipeline
        .highlight("Only one sentence here.", "what is here?", OracleCredentials::default())
        .await
        .expect("first");
    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(store.len(), 1);

    let second = pipeline
        .highlight("Only one sentence here.", "what is here?", OracleCredentials::default())
        .await
        .expect("second");
    assert_eq!(second.status, CacheStatus::Hit);
    assert!(second.status.is_hit());
    assert_eq!(second.result, first.result);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_normalization_makes_padded_requests_identical() {
    let (pipeline, oracle, _store) = build_pipeline(ScriptedOracle::scoring(&[0.5]));

    let first = pipeline
        .highlight("A sentence.", "why?", OracleCredentials::default())
        .await
        .expect("first");
    let second = pipeline
        .highlight("  A sentence.  \n", "\twhy?  ", OracleCredentials::default())
        .await
        .expect("second");

    assert_eq!(first.result.hash, second.result.hash);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_empty_inputs_fail_before_any_oracle_call() {
    let (pipeline, oracle, store) = build_pipeline(ScriptedOracle::scoring(&[0.5]));

    let err = pipeline
        .highlight("   ", "a question?", OracleCredentials::default())
        .await
        .expect_err("empty text");
    assert_eq!(err, HighlightError::EmptyInput { field: "text" });

    let err = pipeline
        .highlight("Some text.", "\n\t", OracleCredentials::default())
        .await
        .expect_err("empty question");
    assert_eq!(err, HighlightError::EmptyInput { field: "question" });

    assert_eq!(oracle.calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_oracle_is_retried_with_backoff() {
    let oracle = ScriptedOracle::with_replies(vec![
        Err(OracleError::Unavailable {
            reason: "overloaded".to_string(),
        }),
        Err(OracleError::Unavailable {
            reason: "overloaded".to_string(),
        }),
        Ok(r#"{"scores": [{"index": 0, "score": 0.4}]}"#.to_string()),
    ]);
    let (pipeline, oracle, store) = build_pipeline(oracle);

    let outcome = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect("highlight");

    assert_eq!(oracle.calls(), 3);
    assert_eq!(outcome.result.sentences[0].score, 0.4);
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_oracle_exhaustion_reports_attempts_and_persists_nothing() {
    let oracle = ScriptedOracle::with_replies(vec![Err(OracleError::Unavailable {
        reason: "down".to_string(),
    })]);
    let (pipeline, oracle, store) = build_pipeline(oracle);

    let err = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        HighlightError::OracleUnavailable {
            attempts: 3,
            reason: "down".to_string(),
        }
    );
    assert_eq!(oracle.calls(), 3);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_credential_failures_are_not_retried() {
    let oracle = ScriptedOracle::with_replies(vec![Err(OracleError::InvalidCredentials {
        reason: "key revoked".to_string(),
    })]);
    let (pipeline, oracle, store) = build_pipeline(oracle);

    let err = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect_err("must fail");

    assert!(matches!(err, HighlightError::InvalidCredentials { .. }));
    assert_eq!(oracle.calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_rejected_requests_are_not_retried() {
    let oracle = ScriptedOracle::with_replies(vec![Err(OracleError::Rejected {
        reason: "prompt too large".to_string(),
    })]);
    let (pipeline, oracle, _store) = build_pipeline(oracle);

    let err = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect_err("must fail");

    assert!(matches!(err, HighlightError::OracleRejected { .. }));
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_missing_key_surfaces_as_invalid_credentials() {
    let (pipeline, oracle, store) =
        build_pipeline(ScriptedOracle::scoring(&[0.5]).require_key());

    let err = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, HighlightError::InvalidCredentials { .. }));
    assert!(store.is_empty());

    // The same request with a key goes through; nothing about the
    // failure was persisted.
    let outcome = pipeline
        .highlight(
            "One sentence.",
            "what?",
            OracleCredentials::from_request_key(Some("a-key".to_string())),
        )
        .await
        .expect("highlight");
    assert_eq!(outcome.status, CacheStatus::Miss);
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_garbled_response_gets_one_fresh_attempt() {
    let oracle = ScriptedOracle::with_replies(vec![
        Ok("I refuse to answer in JSON.".to_string()),
        Ok(r#"{"scores": [{"index": 0, "score": 0.8}]}"#.to_string()),
    ]);
    let (pipeline, oracle, _store) = build_pipeline(oracle);

    let outcome = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect("highlight");

    assert_eq!(oracle.calls(), 2);
    assert_eq!(outcome.result.sentences[0].score, 0.8);
}

#[tokio::test]
async fn test_persistently_garbled_response_is_a_validation_error() {
    let (pipeline, oracle, store) = build_pipeline(ScriptedOracle::always("word salad"));

    let err = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect_err("must fail");

    assert!(matches!(err, HighlightError::Validation { .. }));
    assert_eq!(oracle.calls(), 2);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_store_write_failure_degrades_to_unsaved_result() {
    let (pipeline, _oracle, store) = build_pipeline(ScriptedOracle::scoring(&[0.6]));
    store.set_fail_writes(true);

    let outcome = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect("highlight");

    assert_eq!(outcome.status, CacheStatus::Miss);
    assert_eq!(outcome.result.sentences[0].score, 0.6);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_store_read_failure_still_computes() {
    let (pipeline, oracle, store) = build_pipeline(ScriptedOracle::scoring(&[0.3]));
    store.set_fail_reads(true);

    let outcome = pipeline
        .highlight("One sentence.", "what?", OracleCredentials::default())
        .await
        .expect("highlight");

    assert_eq!(outcome.status, CacheStatus::Miss);
    assert_eq!(oracle.calls(), 1);

    // Writes were healthy, so the result still got persisted.
    store.set_fail_reads(false);
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_same_hash_requests_coalesce() {
    let oracle = ScriptedOracle::scoring(&[0.9]).with_delay(Duration::from_millis(300));
    let (pipeline, oracle, store) = build_pipeline(oracle);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .highlight(
                    "Shared sentence.",
                    "same question?",
                    OracleCredentials::default(),
                )
                .await
        }));
    }

    let mut statuses = Vec::new();
    let mut results = Vec::new();
    for handle in handles {
        let outcome = handle.await.expect("join").expect("highlight");
        statuses.push(outcome.status);
        results.push(outcome.result);
    }

    assert_eq!(oracle.calls(), 1);
    assert_eq!(store.len(), 1);
    let misses = statuses.iter().filter(|s| **s == CacheStatus::Miss).count();
    let coalesced = statuses
        .iter()
        .filter(|s| **s == CacheStatus::Coalesced)
        .count();
    assert_eq!(misses, 1);
    assert_eq!(coalesced, 3);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test(start_paused = true)]
async fn test_different_hashes_do_not_coalesce() {
    let oracle = ScriptedOracle::scoring(&[0.5]).with_delay(Duration::from_millis(100));
    let (pipeline, oracle, store) = build_pipeline(oracle);

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .highlight("First text.", "q?", OracleCredentials::default())
                .await
        })
    };
    let second = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .highlight("Second text.", "q?", OracleCredentials::default())
                .await
        })
    };

    let first = first.await.expect("join").expect("highlight");
    let second = second.await.expect("join").expect("highlight");

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Miss);
    assert_ne!(first.result.hash, second.result.hash);
    assert_eq!(oracle.calls(), 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_persisted_record_carries_the_normalized_query() {
    let (pipeline, _oracle, store) = build_pipeline(ScriptedOracle::scoring(&[0.2, 0.7]));

    let outcome = pipeline
        .highlight("  First one. Second one.  ", " which one? ", OracleCredentials::default())
        .await
        .expect("highlight");

    let record = store
        .get(&outcome.result.hash)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.query.text, "First one. Second one.");
    assert_eq!(record.query.question, "which one?");
    assert_eq!(record.result, outcome.result);
    assert_eq!(record.hash, outcome.result.hash);
}

#[test]
fn test_backoff_grows_exponentially_and_caps() {
    let retry = RetryPolicy {
        max_attempts: 10,
        base_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(8),
    };

    assert_eq!(retry.backoff_for(1), Duration::from_millis(500));
    assert_eq!(retry.backoff_for(2), Duration::from_secs(1));
    assert_eq!(retry.backoff_for(3), Duration::from_secs(2));
    assert_eq!(retry.backoff_for(4), Duration::from_secs(4));
    assert_eq!(retry.backoff_for(5), Duration::from_secs(8));
    assert_eq!(retry.backoff_for(9), Duration::from_secs(8));
}

#[test]
fn test_cache_status_header_values() {
    assert_eq!(CacheStatus::Hit.as_header_value(), "HIT");
    assert_eq!(CacheStatus::Miss.as_header_value(), "MISS");
    assert_eq!(CacheStatus::Coalesced.as_header_value(), "COALESCED");
    assert_eq!(CacheStatus::Coalesced.to_string(), "COALESCED");
}
