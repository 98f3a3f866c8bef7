//! End-to-end tests for a full mock exam.
//!
//! These tests load the sample pool and config fixtures and drive the
//! orchestrator the way a client would: answering, ticking the clock and
//! reading the final score.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use adaptest_engine::{
    CompletionReason, Difficulty, EngineConfig, EngineError, InMemoryPool, MemorySink,
    MockOrchestrator, MockProgress, QuestionDescriptor, QuestionPool, Section, SectionRule,
};

/// Path to the sample exam fixtures.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-exam")
}

fn load_fixtures() -> (Arc<dyn QuestionPool>, EngineConfig) {
    let pool = InMemoryPool::load_from_file(fixture_path().join("pool.json"))
        .expect("Failed to load pool");
    let config = EngineConfig::load_from_dir(&fixture_path()).expect("Failed to load config");
    (Arc::new(pool), config)
}

/// Answers every question with `answer(n)` for the n-th question overall.
fn run_to_end(
    mock: &mut MockOrchestrator,
    answer: impl Fn(usize) -> bool,
) -> Vec<(Section, QuestionDescriptor)> {
    let mut offered = Vec::new();
    let mut progress = mock.start().expect("Failed to start mock");
    while let MockProgress::Question { section, question } = progress {
        offered.push((section, question));
        progress = mock.submit_answer(answer(offered.len())).expect("Failed to submit answer");
    }
    assert!(progress.is_finalized(), "mock should end finalized");
    offered
}

#[test]
fn test_sample_fixtures_load() {
    let pool = InMemoryPool::load_from_file(fixture_path().join("pool.json")).expect("pool");
    assert_eq!(pool.len(), 91, "unknown sections and id-less entries are skipped");

    let summary = pool.summary();
    let quant = summary.section(Section::Quantitative);
    assert_eq!(quant.valid, 30);
    assert_eq!(quant.invalid, 1);
    assert_eq!(summary.section(Section::Verbal).valid, 30);

    let config = EngineConfig::load_from_dir(&fixture_path()).expect("config");
    assert_eq!(config.sections, Section::ALL.to_vec());
    let rules = &config.section_rules;
    assert_eq!(rules.get(Section::Quantitative).required_count, 6);
    assert_eq!(rules.get(Section::DataInsights).time_limit_seconds, 600);
    assert_eq!(config.seed, Some(42));
}

#[test]
fn test_full_mock_all_correct() {
    let (pool, config) = load_fixtures();
    let sink = Arc::new(MemorySink::new());
    let mut mock = MockOrchestrator::new(pool, config).with_sink(sink.clone());

    let offered = run_to_end(&mut mock, |_| true);
    assert_eq!(offered.len(), 6 + 5 + 4);

    let session = mock.session();
    let score = session.score.as_ref().expect("score");
    assert_eq!(score.total_scaled_score, 785);
    for section in Section::ALL {
        let result = session.result(section).expect("section result");
        assert_eq!(result.completion_reason, CompletionReason::RequiredCountReached);
        assert_eq!(result.score_estimate, 90);
        assert_eq!(sink.attempts(section), 1);
    }

    let payloads = sink.results();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].test_type, "mock");
    assert_eq!(payloads[0].answers.len(), 15);
}

#[test]
fn test_sections_are_sequential_and_questions_fresh() {
    let (pool, config) = load_fixtures();
    let mut mock = MockOrchestrator::new(pool, config);
    let offered = run_to_end(&mut mock, |n| n % 3 != 0);

    let order: Vec<Section> = offered.iter().map(|(s, _)| *s).collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted, "a later section never starts before an earlier one ends");

    let mut ids = HashSet::new();
    for (section, question) in &offered {
        assert!(question.is_valid_for(*section));
        assert!(ids.insert(question.id.clone()), "question {} repeated", question.id);
    }
}

#[test]
fn test_cursor_trajectory_follows_answers() {
    let (pool, config) = load_fixtures();
    let mut mock = MockOrchestrator::new(pool, config);
    run_to_end(&mut mock, |n| n % 2 == 1);

    for result in &mock.session().results {
        assert_eq!(result.cursor_trajectory[0], Difficulty::MEDIUM);
        assert_eq!(result.cursor_trajectory.len(), result.history.len() + 1);
        for (i, record) in result.history.iter().enumerate() {
            let before = result.cursor_trajectory[i];
            let after = result.cursor_trajectory[i + 1];
            let expected = if record.is_correct {
                before.harder()
            } else {
                before.easier()
            };
            assert_eq!(after, expected);
        }
    }
}

#[test]
fn test_seeded_mocks_are_reproducible() {
    let ids = || {
        let (pool, config) = load_fixtures();
        let mut mock = MockOrchestrator::new(pool, config);
        run_to_end(&mut mock, |n| n % 4 != 0)
            .into_iter()
            .map(|(_, q)| q.id)
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(), ids());
}

#[test]
fn test_timeout_completes_section_with_partial_history() {
    let (pool, mut config) = load_fixtures();
    config.section_rules.quantitative = SectionRule::new(6, 30);
    let mut mock = MockOrchestrator::new(pool, config);
    mock.start().expect("start");

    // Answer one question every ten seconds.
    let mut progress = mock.tick().expect("tick");
    for second in 2..=60 {
        if second % 10 == 1 {
            mock.submit_answer(true).expect("answer");
        }
        progress = mock.tick().expect("tick");
        if !matches!(progress, MockProgress::Running { .. }) {
            break;
        }
    }

    assert!(matches!(
        progress,
        MockProgress::Question { section: Section::Verbal, .. }
    ));
    let quant = mock
        .session()
        .result(Section::Quantitative)
        .expect("quant result");
    assert_eq!(quant.completion_reason, CompletionReason::TimeExpired);
    assert_eq!(quant.history.len(), 2);
    assert_eq!(quant.time_taken_seconds, 30);
}

#[test]
fn test_small_pool_exhausts_section() {
    let (_, config) = load_fixtures();
    let mut questions = Vec::new();
    for section in [Section::Quantitative, Section::DataInsights] {
        for d in 1..=5 {
            for i in 0..3 {
                let id = format!("{}-{d}-{i}", section.key());
                questions.push(QuestionDescriptor::new(id, section, d));
            }
        }
    }
    questions.push(QuestionDescriptor::new("v-1", Section::Verbal, 1));
    questions.push(QuestionDescriptor::new("v-2", Section::Verbal, 5));
    questions.push(QuestionDescriptor::new("v-3", Section::Verbal, 3));

    let mut mock = MockOrchestrator::new(Arc::new(InMemoryPool::new(questions)), config);
    run_to_end(&mut mock, |_| false);

    let verbal = mock
        .session()
        .result(Section::Verbal)
        .expect("verbal result");
    assert_eq!(verbal.completion_reason, CompletionReason::PoolExhausted);
    assert_eq!(verbal.history.len(), 3);
    assert!(mock.is_finalized());
}

#[test]
fn test_misuse_is_rejected_without_change() {
    let (pool, config) = load_fixtures();
    let mut mock = MockOrchestrator::new(pool, config);

    let err = mock.submit_answer(true).expect_err("not started");
    assert!(err.is_misuse());
    assert!(matches!(err, EngineError::MockNotStarted));

    run_to_end(&mut mock, |_| true);
    let before = mock.session().clone();
    let err = mock.tick().expect_err("finalized");
    assert!(matches!(err, EngineError::MockFinalized));
    assert_eq!(mock.session(), &before);
}
