//! Integration tests for live, timed sections.
//!
//! Time is paused so the section clock advances only when every task is idle.

use std::path::PathBuf;
use std::time::Duration;

use adaptest_engine::{
    AnswerOutcome, CompletionReason, EngineConfig, EngineError, InMemoryPool, LiveSection, Section,
    SectionRule, SectionSession, SessionStatus,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-exam")
}

fn verbal_session(rule: SectionRule) -> (SectionSession, Duration) {
    let pool = InMemoryPool::load_from_file(fixture_path().join("pool.json")).expect("pool");
    let config = EngineConfig::load_from_dir(&fixture_path()).expect("config");
    let session = SectionSession::from_pool(Section::Verbal, rule, &pool, StdRng::seed_from_u64(7));
    (session, config.tick_interval())
}

#[tokio::test(start_paused = true)]
async fn test_live_section_times_out_mid_answer() {
    let (session, tick) = verbal_session(SectionRule::new(23, 120));
    let live = LiveSection::spawn(session, tick).expect("spawn");
    let handle = live.handle();

    // One answer every 25 seconds: four answers fit before the clock runs out.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_secs(25)).await;
        let outcome = handle.submit_answer(true).await.expect("answer");
        assert!(matches!(outcome, AnswerOutcome::Next(_)));
    }

    tokio::time::sleep(Duration::from_secs(25)).await;
    let err = handle
        .submit_answer(true)
        .await
        .expect_err("section closed");
    assert!(matches!(err, EngineError::SessionClosed { .. }));

    let result = live.finished().await.expect("result");
    assert_eq!(result.completion_reason, CompletionReason::TimeExpired);
    assert_eq!(result.history.len(), 4);
    assert_eq!(result.time_taken_seconds, 120);
    assert_eq!(result.payload().test_type, "verbal");
}

#[tokio::test(start_paused = true)]
async fn test_live_section_completes_on_answers() {
    let (session, tick) = verbal_session(SectionRule::new(5, 900));
    let live = LiveSection::spawn(session, tick).expect("spawn");
    let handle = live.handle();

    // Stay half a second off the tick boundaries.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut last = None;
    for n in 0..5 {
        tokio::time::sleep(Duration::from_secs(3)).await;
        last = Some(handle.submit_answer(n % 2 == 0).await.expect("answer"));
    }
    assert_eq!(
        last,
        Some(AnswerOutcome::Completed(CompletionReason::RequiredCountReached))
    );

    let result = live.finished().await.expect("result");
    assert_eq!(result.history.len(), 5);
    assert_eq!(result.time_taken_seconds, 15);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_while_running_and_teardown() {
    let (session, tick) = verbal_session(SectionRule::new(5, 900));
    let live = LiveSection::spawn(session, tick).expect("spawn");
    let handle = live.handle();
    let first = live.first_question().expect("first question").clone();

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    let snapshot = handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.status, SessionStatus::InProgress);
    assert_eq!(snapshot.remaining_seconds, 890);
    assert_eq!(snapshot.current_question, Some(first));

    assert!(handle.teardown().await);
    let err = live.finished().await.expect_err("torn down");
    assert!(matches!(err, EngineError::SessionTornDown { answered: 0, .. }));
    assert!(handle.is_closed());
}
