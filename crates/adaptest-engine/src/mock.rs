//! Full mock exam orchestration.
//!
//! The orchestrator runs the configured sections strictly in order. Each
//! section is a fresh [`SectionSession`] over the pool's descriptors for that
//! section; a later section is only started once the previous one has
//! completed. After the last section the mock is scored and finalized.
//!
//! The caller drives everything through [`MockOrchestrator::start`],
//! [`MockOrchestrator::submit_answer`] and [`MockOrchestrator::tick`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pool::QuestionPool;
use crate::question::{QuestionDescriptor, Section};
use crate::scoring::ScoreResult;
use crate::session::{AnswerOutcome, SectionResult, SectionSession, SessionSnapshot, TickOutcome};
use crate::sink::{NoopSink, ResultPayload, ResultSink};

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum MockProgress {
    /// Answer this question.
    Question {
        /// Section the question belongs to.
        section: Section,
        /// The question on offer.
        question: QuestionDescriptor,
    },
    /// The clock ticked and the current question is still on offer.
    Running {
        /// Section being taken.
        section: Section,
        /// Seconds left in the section.
        remaining_seconds: u32,
    },
    /// Every section is done; the mock is scored.
    Finalized(ScoreResult),
}

impl MockProgress {
    /// Returns `true` if the mock has been finalized.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

/// Accumulated state of a mock exam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSession {
    /// Completed sections in the order they ran.
    pub results: Vec<SectionResult>,
    /// Score, present once finalized.
    pub score: Option<ScoreResult>,
    /// When the first section started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the mock was finalized.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl MockSession {
    /// Returns `true` once the mock has been scored.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.score.is_some()
    }

    /// Result of `section`, if it has completed.
    #[must_use]
    pub fn result(&self, section: Section) -> Option<&SectionResult> {
        self.results.iter().find(|r| r.section == section)
    }

    /// Outbound payload, present once finalized.
    #[must_use]
    pub fn payload(&self) -> Option<ResultPayload> {
        self.score
            .as_ref()
            .map(|score| ResultPayload::from_mock(&self.results, score))
    }

    /// Seconds used across all completed sections.
    #[must_use]
    pub fn time_taken_seconds(&self) -> u32 {
        self.results.iter().map(|r| r.time_taken_seconds).sum()
    }
}

/// Runs a full mock exam section by section.
pub struct MockOrchestrator {
    pool: Arc<dyn QuestionPool>,
    config: EngineConfig,
    rng: StdRng,
    sink: Arc<dyn ResultSink>,
    next_section: usize,
    current: Option<SectionSession>,
    session: MockSession,
}

impl std::fmt::Debug for MockOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockOrchestrator")
            .field("sections", &self.config.sections)
            .field("next_section", &self.next_section)
            .field("current", &self.current.as_ref().map(SectionSession::section))
            .field("completed", &self.session.results.len())
            .field("finalized", &self.session.is_finalized())
            .finish_non_exhaustive()
    }
}

impl MockOrchestrator {
    /// Creates an orchestrator that reports to no sink.
    ///
    /// Uses `config.seed` for the random source when present.
    #[must_use]
    pub fn new(pool: Arc<dyn QuestionPool>, config: EngineConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            pool,
            config,
            rng,
            sink: Arc::new(NoopSink),
            next_section: 0,
            current: None,
            session: MockSession::default(),
        }
    }

    /// Reports completed sections and the final score to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts the first section.
    ///
    /// Sections whose pool is empty complete at once and are skipped, so the
    /// returned progress may already be later in the exam or finalized.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MockFinalized` if the mock is already finalized
    /// and `EngineError::SessionAlreadyStarted` if a section is running.
    pub fn start(&mut self) -> Result<MockProgress> {
        if self.session.is_finalized() {
            return Err(EngineError::MockFinalized);
        }
        if let Some(current) = &self.current {
            return Err(EngineError::SessionAlreadyStarted {
                section: current.section(),
            });
        }

        self.session.started_at = Some(Utc::now());
        info!(sections = ?self.config.sections, "Mock exam started");
        self.advance()
    }

    /// Submits the graded answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MockNotStarted` before [`MockOrchestrator::start`]
    /// and `EngineError::MockFinalized` after the last section.
    pub fn submit_answer(&mut self, is_correct: bool) -> Result<MockProgress> {
        let current = self.current_mut()?;
        let section = current.section();
        match current.submit_answer(is_correct)? {
            AnswerOutcome::Next(question) => Ok(MockProgress::Question { section, question }),
            AnswerOutcome::Completed(_) => self.close_current(),
        }
    }

    /// Advances the current section's clock by one second.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MockNotStarted` before [`MockOrchestrator::start`]
    /// and `EngineError::MockFinalized` after the last section.
    pub fn tick(&mut self) -> Result<MockProgress> {
        let current = self.current_mut()?;
        let section = current.section();
        match current.tick()? {
            TickOutcome::Running { remaining_seconds } => Ok(MockProgress::Running {
                section,
                remaining_seconds,
            }),
            TickOutcome::Completed(_) => self.close_current(),
        }
    }

    /// Section currently running.
    #[must_use]
    pub fn current_section(&self) -> Option<Section> {
        self.current.as_ref().map(SectionSession::section)
    }

    /// Snapshot of the section currently running.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<SessionSnapshot> {
        self.current.as_ref().map(SectionSession::snapshot)
    }

    /// Accumulated mock state.
    #[must_use]
    pub const fn session(&self) -> &MockSession {
        &self.session
    }

    /// Returns `true` once every section has completed and been scored.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.session.is_finalized()
    }

    /// Consumes the orchestrator and returns the mock state.
    #[must_use]
    pub fn into_session(self) -> MockSession {
        self.session
    }

    fn current_mut(&mut self) -> Result<&mut SectionSession> {
        if self.session.is_finalized() {
            return Err(EngineError::MockFinalized);
        }
        self.current.as_mut().ok_or(EngineError::MockNotStarted)
    }

    /// Records the completed current section and moves on.
    fn close_current(&mut self) -> Result<MockProgress> {
        if let Some(finished) = self.current.take() {
            self.record(&finished);
        }
        self.advance()
    }

    /// Starts sections until one offers a question, or finalizes.
    fn advance(&mut self) -> Result<MockProgress> {
        while let Some(&section) = self.config.sections.get(self.next_section) {
            self.next_section += 1;

            let rng = StdRng::seed_from_u64(self.rng.gen());
            let mut session = SectionSession::from_pool(
                section,
                self.config.section_rules.get(section),
                self.pool.as_ref(),
                rng,
            );

            match session.start()? {
                Some(question) => {
                    self.current = Some(session);
                    return Ok(MockProgress::Question { section, question });
                }
                None => {
                    warn!(%section, "Section has no questions; skipping");
                    self.record(&session);
                }
            }
        }

        Ok(MockProgress::Finalized(self.finalize()))
    }

    fn record(&mut self, finished: &SectionSession) {
        let Some(result) = finished.result() else {
            return;
        };
        if let Err(e) = self.sink.increment_attempts(result.section) {
            warn!(section = %result.section, error = %e, "Failed to count attempt");
        }
        self.session.results.push(result);
    }

    fn finalize(&mut self) -> ScoreResult {
        let score = ScoreResult::from_results(&self.session.results);
        self.session.score = Some(score.clone());
        self.session.finalized_at = Some(Utc::now());

        if let Some(payload) = self.session.payload() {
            if let Err(e) = self.sink.record_result(&payload) {
                warn!(error = %e, "Failed to record mock result");
            }
        }

        info!(
            total_scaled_score = score.total_scaled_score,
            sections = self.session.results.len(),
            time_taken_seconds = self.session.time_taken_seconds(),
            "Mock exam finalized"
        );
        score
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{SectionRule, SectionRules};
    use crate::pool::InMemoryPool;
    use crate::session::CompletionReason;
    use crate::sink::MemorySink;

    fn pool(sections: &[Section], per_bucket: usize) -> Arc<dyn QuestionPool> {
        let questions = sections
            .iter()
            .flat_map(|s| {
                (1..=5).flat_map(move |d| {
                    (0..per_bucket).map(move |i| {
                        QuestionDescriptor::new(format!("{}-{d}-{i}", s.key()), *s, d)
                    })
                })
            })
            .collect();
        Arc::new(InMemoryPool::new(questions))
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            section_rules: SectionRules {
                quantitative: SectionRule::new(3, 300),
                verbal: SectionRule::new(2, 300),
                data_insights: SectionRule::new(4, 300),
            },
            seed: Some(9),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_mutators_before_start_rejected() {
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 2), small_config());
        assert!(matches!(
            mock.submit_answer(true).unwrap_err(),
            EngineError::MockNotStarted
        ));
        assert!(matches!(mock.tick().unwrap_err(), EngineError::MockNotStarted));
    }

    #[test]
    fn test_sections_run_in_order() {
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), small_config());
        let mut progress = mock.start().unwrap();
        let mut seen_sections = Vec::new();

        while let MockProgress::Question { section, .. } = progress {
            if seen_sections.last() != Some(&section) {
                seen_sections.push(section);
            }
            progress = mock.submit_answer(true).unwrap();
        }

        assert_eq!(seen_sections, Section::ALL.to_vec());
        assert!(progress.is_finalized());

        let session = mock.session();
        let order: Vec<Section> = session.results.iter().map(|r| r.section).collect();
        assert_eq!(order, Section::ALL.to_vec());
        assert_eq!(
            session.result(Section::Quantitative).unwrap().history.len(),
            3
        );
        assert_eq!(session.result(Section::Verbal).unwrap().history.len(), 2);
        assert_eq!(
            session.result(Section::DataInsights).unwrap().history.len(),
            4
        );
    }

    #[test]
    fn test_all_correct_scores_top() {
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), small_config());
        let mut progress = mock.start().unwrap();
        while !progress.is_finalized() {
            progress = mock.submit_answer(true).unwrap();
        }

        let score = mock.session().score.clone().unwrap();
        assert_eq!(score.total_scaled_score, 785);
        assert!(score.per_section.values().all(|s| s.scaled_score == 90));
    }

    #[test]
    fn test_mutators_after_finalize_rejected() {
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), small_config());
        let mut progress = mock.start().unwrap();
        while !progress.is_finalized() {
            progress = mock.submit_answer(false).unwrap();
        }

        let before = mock.session().clone();
        assert!(matches!(
            mock.submit_answer(true).unwrap_err(),
            EngineError::MockFinalized
        ));
        assert!(matches!(mock.tick().unwrap_err(), EngineError::MockFinalized));
        assert!(matches!(mock.start().unwrap_err(), EngineError::MockFinalized));
        assert_eq!(mock.session(), &before);
    }

    #[test]
    fn test_timeout_moves_to_next_section() {
        let mut config = small_config();
        config.section_rules.quantitative = SectionRule::new(21, 5);
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), config);
        mock.start().unwrap();
        mock.submit_answer(true).unwrap();

        let mut progress = mock.tick().unwrap();
        while let MockProgress::Running { section, .. } = progress {
            assert_eq!(section, Section::Quantitative);
            progress = mock.tick().unwrap();
        }

        assert!(matches!(
            progress,
            MockProgress::Question { section: Section::Verbal, .. }
        ));
        let quant = mock.session().result(Section::Quantitative).unwrap();
        assert_eq!(quant.completion_reason, CompletionReason::TimeExpired);
        assert_eq!(quant.history.len(), 1);
        assert_eq!(mock.current_section(), Some(Section::Verbal));
    }

    #[test]
    fn test_empty_section_is_skipped() {
        let mut mock = MockOrchestrator::new(
            pool(&[Section::Quantitative, Section::DataInsights], 3),
            small_config(),
        );
        let mut progress = mock.start().unwrap();
        let mut offered = Vec::new();
        while let MockProgress::Question { section, .. } = progress {
            offered.push(section);
            progress = mock.submit_answer(true).unwrap();
        }

        assert!(!offered.contains(&Section::Verbal));
        let verbal = mock.session().result(Section::Verbal).unwrap();
        assert!(verbal.history.is_empty());
        assert_eq!(verbal.completion_reason, CompletionReason::PoolExhausted);
        assert_eq!(mock.session().results.len(), 3);
    }

    #[test]
    fn test_sink_receives_attempts_and_payload() {
        let sink = Arc::new(MemorySink::new());
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), small_config())
            .with_sink(sink.clone());
        let mut progress = mock.start().unwrap();
        while !progress.is_finalized() {
            progress = mock.submit_answer(true).unwrap();
        }

        for section in Section::ALL {
            assert_eq!(sink.attempts(section), 1);
        }
        let results = sink.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_type, "mock");
        assert_eq!(results[0].answers.len(), 9);
        assert_eq!(results[0].score, 785);
    }

    #[test]
    fn test_same_seed_same_questions() {
        let run = || {
            let mut mock = MockOrchestrator::new(pool(&Section::ALL, 4), small_config());
            let mut ids = Vec::new();
            let mut progress = mock.start().unwrap();
            let mut i = 0;
            while let MockProgress::Question { question, .. } = progress {
                ids.push(question.id);
                i += 1;
                progress = mock.submit_answer(i % 2 == 0).unwrap();
            }
            ids
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_custom_section_order() {
        let mut config = small_config();
        config.sections = vec![Section::Verbal, Section::Quantitative];
        let mut mock = MockOrchestrator::new(pool(&Section::ALL, 3), config);

        let progress = mock.start().unwrap();
        assert!(matches!(progress, MockProgress::Question { section: Section::Verbal, .. }));

        let mut progress = progress;
        while !progress.is_finalized() {
            progress = mock.submit_answer(true).unwrap();
        }
        assert_eq!(mock.session().results.len(), 2);
        assert_eq!(
            mock.session().score.as_ref().unwrap().per_section.len(),
            2
        );
    }
}
