//! Tests that run a mock exam and render its report.

use std::path::PathBuf;
use std::sync::Arc;

use adaptest_engine::{
    CompletionReason, EngineConfig, InMemoryPool, MockOrchestrator, MockProgress, MockSession,
    Section, SectionResult, SectionRule, SectionScore,
};
use adaptest_report::{
    AnswerInput, MarkdownGenerator, Report, ReportInput, ReportStatus, SectionInput, SectionOutcome,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-exam")
}

fn mock(config: EngineConfig) -> MockOrchestrator {
    let pool = InMemoryPool::load_from_file(fixture_path().join("pool.json")).expect("pool");
    MockOrchestrator::new(Arc::new(pool), config)
}

fn run(mock: &mut MockOrchestrator, is_correct: bool) -> MockSession {
    let mut progress = mock.start().expect("start");
    while matches!(progress, MockProgress::Question { .. }) {
        progress = mock.submit_answer(is_correct).expect("answer");
    }
    mock.session().clone()
}

fn report_input(session: &MockSession, expected_sections: usize) -> ReportInput {
    ReportInput {
        title: "Fixture mock".to_string(),
        expected_sections,
        total_scaled_score: session.score.as_ref().map(|s| s.total_scaled_score),
        sections: session.results.iter().map(section_input).collect(),
    }
}

fn section_input(result: &SectionResult) -> SectionInput {
    let score = SectionScore::from_answers(&result.history);
    SectionInput {
        name: result.section.to_string(),
        required_count: result.required_count,
        scaled_score: score.scaled_score,
        quick_score: result.score_estimate,
        accuracy: score.accuracy,
        outcome: match result.completion_reason {
            CompletionReason::RequiredCountReached => SectionOutcome::RequiredCountReached,
            CompletionReason::TimeExpired => SectionOutcome::TimeExpired,
            CompletionReason::PoolExhausted => SectionOutcome::PoolExhausted,
        },
        time_taken_seconds: result.time_taken_seconds,
        answers: result
            .history
            .iter()
            .map(|r| AnswerInput::new(&r.question_id, r.difficulty.value(), r.is_correct))
            .collect(),
        difficulty_trajectory: result
            .cursor_trajectory
            .iter()
            .map(|d| d.value())
            .collect(),
    }
}

#[test]
fn test_perfect_mock_report() {
    let config = EngineConfig::load_from_dir(&fixture_path()).expect("config");
    let expected = config.sections.len();
    let session = run(&mut mock(config), true);

    let report = Report::from_input(&report_input(&session, expected)).expect("report");
    assert_eq!(report.summary.status, ReportStatus::Completed);
    assert_eq!(report.summary.total_scaled_score, Some(785));
    assert_eq!(report.summary.questions_answered, 15);
    assert_eq!(report.sections.len(), 3);
    assert!(report.recommendations.is_empty());
    assert!(report.sections.iter().all(|s| s.scaled_score == 90));

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("| Total Score | 785 |"));
    assert!(markdown.contains("| Sections | 3 of 3 |"));
    assert!(markdown.contains("| Quantitative | 6/6 | 6 | 100.0% | 90 |"));
    assert!(markdown.contains("- **Data Insights** difficulty path: 3 → 4 → 5 → 5 → 5 (peak 5)"));
    assert!(markdown.contains("*No specific recommendations.*"));
}

#[test]
fn test_report_json_written_to_disk() {
    let config = EngineConfig::load_from_dir(&fixture_path()).expect("config");
    let session = run(&mut mock(config), false);
    let report = Report::from_input(&report_input(&session, 3)).expect("report");

    let dir = std::env::temp_dir().join(format!("adaptest-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create output dir");
    let path = report.write_json(&dir).expect("write report");
    assert_eq!(path, dir.join("adaptest-fixture-mock.json"));
    let written = std::fs::read_to_string(&path).expect("read report");
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir(&dir);

    let parsed: Report = serde_json::from_str(&written).expect("parse report");
    assert_eq!(parsed.summary.total_scaled_score, Some(455));
    assert_eq!(parsed.sections.len(), 3);
    assert_eq!(parsed.recommendations.len(), 3);
    assert!(parsed
        .recommendations
        .iter()
        .all(|r| r.category == "accuracy" && r.description.contains("fundamentals")));

    let easiest = parsed
        .difficulty_stats
        .iter()
        .find(|s| s.difficulty == 1)
        .expect("difficulty 1 answered");
    assert_eq!(easiest.correct, 0);
}

#[test]
fn test_timed_out_section_gets_pacing_advice() {
    let mut config = EngineConfig::load_from_dir(&fixture_path()).expect("config");
    config.section_rules.verbal = SectionRule::new(5, 3);
    let mut mock = mock(config);

    let mut progress = mock.start().expect("start");
    loop {
        progress = match progress {
            MockProgress::Question { section, .. } if section == Section::Verbal => {
                mock.tick().expect("tick")
            }
            MockProgress::Question { .. } => mock.submit_answer(true).expect("answer"),
            MockProgress::Running { .. } => mock.tick().expect("tick"),
            MockProgress::Finalized(_) => break,
        };
    }

    let report = Report::from_input(&report_input(mock.session(), 3)).expect("report");
    let verbal = report
        .sections
        .iter()
        .find(|s| s.name == "Verbal")
        .expect("verbal section");
    assert_eq!(verbal.outcome, SectionOutcome::TimeExpired);
    assert_eq!(verbal.answered, 0);
    assert_eq!(
        report.weakest_section().map(|s| s.name.as_str()),
        Some("Verbal")
    );

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("**[pacing]** Verbal: time ran out after 0 of 5 questions."));
}
