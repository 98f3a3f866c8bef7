//! Section session state machine.
//!
//! A section moves through `NotStarted -> InProgress -> Completed` and never
//! leaves `Completed`. It completes exactly once, for one of three reasons:
//!
//! - the required number of answers was reached
//! - the section clock ran out
//! - the pool had no fresh question left at any difficulty
//!
//! None of these is an error. Calls made in the wrong state are rejected
//! with a misuse error and leave the session untouched.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SectionRule;
use crate::error::{EngineError, Result};
use crate::pool::QuestionPool;
use crate::question::{AnsweredRecord, Difficulty, QuestionDescriptor, Section};
use crate::scoring::quick_scaled_score;
use crate::selector::{select_next, Selection};

// ============================================================================
// SessionStatus and CompletionReason
// ============================================================================

/// Lifecycle status of a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not started.
    #[default]
    NotStarted,
    /// A question is on offer and the clock is running.
    InProgress,
    /// Finished; no further changes are accepted.
    Completed,
}

impl SessionStatus {
    /// Returns `true` if this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Why a section completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The required number of answers was submitted.
    RequiredCountReached,
    /// The section clock reached zero.
    TimeExpired,
    /// No unseen valid question remained at any difficulty.
    PoolExhausted,
}

impl CompletionReason {
    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::RequiredCountReached => "All required questions answered",
            Self::TimeExpired => "Time expired",
            Self::PoolExhausted => "Ran out of fresh questions",
        }
    }
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The section continues with this question.
    Next(QuestionDescriptor),
    /// The answer completed the section.
    Completed(CompletionReason),
}

/// Result of a clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The section is still running.
    Running {
        /// Seconds left on the clock.
        remaining_seconds: u32,
    },
    /// The tick ran the clock out.
    Completed(CompletionReason),
}

// ============================================================================
// SectionResult
// ============================================================================

/// Snapshot of a completed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    /// Section that was taken.
    pub section: Section,
    /// Answers in submission order.
    pub history: Vec<AnsweredRecord>,
    /// Quick scaled score of `history`.
    pub score_estimate: u8,
    /// Seconds used on the section clock.
    pub time_taken_seconds: u32,
    /// Why the section ended.
    pub completion_reason: CompletionReason,
    /// Answers the section asked for.
    pub required_count: usize,
    /// Cursor after each answer, starting with the initial cursor.
    pub cursor_trajectory: Vec<Difficulty>,
    /// When the section completed.
    pub completed_at: DateTime<Utc>,
}

impl SectionResult {
    /// Number of correct answers.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.history.iter().filter(|r| r.is_correct).count()
    }
}

/// Read-only view of a running section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Section being taken.
    pub section: Section,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Current difficulty cursor.
    pub cursor: Difficulty,
    /// Question on offer, if any.
    pub current_question: Option<QuestionDescriptor>,
    /// Answers submitted so far.
    pub answered: usize,
    /// Answers the section asks for.
    pub required_count: usize,
    /// Seconds left on the clock.
    pub remaining_seconds: u32,
}

// ============================================================================
// SectionSession
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    NotStarted,
    InProgress { current: QuestionDescriptor },
    Completed { reason: CompletionReason },
}

/// Mutable state of one timed section.
///
/// The random source is injected so that tests can force draws.
#[derive(Debug)]
pub struct SectionSession<R = StdRng> {
    section: Section,
    rule: SectionRule,
    pool: Vec<QuestionDescriptor>,
    rng: R,
    phase: Phase,
    cursor: Difficulty,
    seen: HashSet<String>,
    history: Vec<AnsweredRecord>,
    cursor_trajectory: Vec<Difficulty>,
    remaining_seconds: u32,
    completed_at: Option<DateTime<Utc>>,
}

impl SectionSession<StdRng> {
    /// Creates a section over `pool` with an entropy-seeded random source.
    #[must_use]
    pub fn new(section: Section, rule: SectionRule, pool: Vec<QuestionDescriptor>) -> Self {
        Self::with_rng(section, rule, pool, StdRng::from_entropy())
    }

    /// Creates a section over `pool` with a seeded random source.
    #[must_use]
    pub fn seeded(
        section: Section,
        rule: SectionRule,
        pool: Vec<QuestionDescriptor>,
        seed: u64,
    ) -> Self {
        Self::with_rng(section, rule, pool, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SectionSession<R> {
    /// Creates a section over `pool` with the given random source.
    #[must_use]
    pub fn with_rng(
        section: Section,
        rule: SectionRule,
        pool: Vec<QuestionDescriptor>,
        rng: R,
    ) -> Self {
        Self {
            section,
            rule,
            pool,
            rng,
            phase: Phase::NotStarted,
            cursor: Difficulty::MEDIUM,
            seen: HashSet::new(),
            history: Vec::new(),
            cursor_trajectory: Vec::new(),
            remaining_seconds: rule.time_limit_seconds,
            completed_at: None,
        }
    }

    /// Creates a section whose questions are taken from `pool` now.
    ///
    /// The pool is not consulted again for the lifetime of the section.
    #[must_use]
    pub fn from_pool(section: Section, rule: SectionRule, pool: &dyn QuestionPool, rng: R) -> Self {
        Self::with_rng(section, rule, pool.for_section(section), rng)
    }

    /// Starts the section and offers the first question.
    ///
    /// Returns `None` if the pool has no valid question at all; the section
    /// is then completed immediately with an empty history.
    pub fn start(&mut self) -> Result<Option<QuestionDescriptor>> {
        match self.phase {
            Phase::NotStarted => {}
            Phase::InProgress { .. } => {
                return Err(EngineError::SessionAlreadyStarted {
                    section: self.section,
                });
            }
            Phase::Completed { .. } => {
                return Err(EngineError::SessionCompleted {
                    section: self.section,
                });
            }
        }

        self.cursor = Difficulty::MEDIUM;
        self.seen.clear();
        self.history.clear();
        self.cursor_trajectory = vec![self.cursor];
        self.remaining_seconds = self.rule.time_limit_seconds;

        info!(
            section = %self.section,
            required = self.rule.required_count,
            time_limit_seconds = self.rule.time_limit_seconds,
            pool_size = self.pool.len(),
            "Section started"
        );

        match self.draw() {
            Selection::Selected(question) => {
                self.seen.insert(question.id.clone());
                self.phase = Phase::InProgress {
                    current: question.clone(),
                };
                Ok(Some(question))
            }
            Selection::Exhausted => {
                self.complete(CompletionReason::PoolExhausted);
                Ok(None)
            }
        }
    }

    /// Removes one second from the section clock.
    ///
    /// Completes the section when the clock reaches zero.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.ensure_in_progress()?;

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.complete(CompletionReason::TimeExpired);
            return Ok(TickOutcome::Completed(CompletionReason::TimeExpired));
        }

        Ok(TickOutcome::Running {
            remaining_seconds: self.remaining_seconds,
        })
    }

    /// Records the graded answer to the question on offer.
    ///
    /// Moves the cursor one step up on a correct answer and one step down on
    /// an incorrect one, then either completes the section or offers the
    /// next question.
    pub fn submit_answer(&mut self, is_correct: bool) -> Result<AnswerOutcome> {
        self.ensure_in_progress()?;
        let Phase::InProgress { current } = std::mem::replace(&mut self.phase, Phase::NotStarted)
        else {
            return Err(EngineError::SessionNotStarted {
                section: self.section,
            });
        };

        let difficulty = current.difficulty().unwrap_or(self.cursor);
        self.history
            .push(AnsweredRecord::new(current.id.clone(), difficulty, is_correct));
        self.cursor = if is_correct {
            self.cursor.harder()
        } else {
            self.cursor.easier()
        };
        self.cursor_trajectory.push(self.cursor);

        debug!(
            section = %self.section,
            question_id = %current.id,
            %difficulty,
            is_correct,
            cursor = %self.cursor,
            answered = self.history.len(),
            "Answer recorded"
        );

        if self.history.len() >= self.rule.required_count {
            self.complete(CompletionReason::RequiredCountReached);
            return Ok(AnswerOutcome::Completed(CompletionReason::RequiredCountReached));
        }

        match self.draw() {
            Selection::Selected(question) => {
                self.seen.insert(question.id.clone());
                self.phase = Phase::InProgress {
                    current: question.clone(),
                };
                Ok(AnswerOutcome::Next(question))
            }
            Selection::Exhausted => {
                self.complete(CompletionReason::PoolExhausted);
                Ok(AnswerOutcome::Completed(CompletionReason::PoolExhausted))
            }
        }
    }

    fn draw(&mut self) -> Selection {
        select_next(
            self.section,
            i64::from(self.cursor.value()),
            &self.seen,
            &self.pool,
            &mut self.rng,
        )
    }

    fn ensure_in_progress(&self) -> Result<()> {
        match self.phase {
            Phase::InProgress { .. } => Ok(()),
            Phase::NotStarted => Err(EngineError::SessionNotStarted {
                section: self.section,
            }),
            Phase::Completed { .. } => Err(EngineError::SessionCompleted {
                section: self.section,
            }),
        }
    }

    fn complete(&mut self, reason: CompletionReason) {
        self.phase = Phase::Completed { reason };
        self.completed_at = Some(Utc::now());
        info!(
            section = %self.section,
            %reason,
            answered = self.history.len(),
            required = self.rule.required_count,
            remaining_seconds = self.remaining_seconds,
            "Section completed"
        );
    }
}

impl<R> SectionSession<R> {
    /// Section being taken.
    pub const fn section(&self) -> Section {
        self.section
    }

    /// Current lifecycle status.
    pub const fn status(&self) -> SessionStatus {
        match self.phase {
            Phase::NotStarted => SessionStatus::NotStarted,
            Phase::InProgress { .. } => SessionStatus::InProgress,
            Phase::Completed { .. } => SessionStatus::Completed,
        }
    }

    /// Returns `true` once the section has completed.
    pub const fn is_completed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Why the section completed, if it has.
    pub const fn completion_reason(&self) -> Option<CompletionReason> {
        match self.phase {
            Phase::Completed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Question on offer, if the section is in progress.
    pub const fn current_question(&self) -> Option<&QuestionDescriptor> {
        match &self.phase {
            Phase::InProgress { current } => Some(current),
            _ => None,
        }
    }

    /// Current difficulty cursor.
    pub const fn cursor(&self) -> Difficulty {
        self.cursor
    }

    /// Ids offered so far, including the one on offer.
    pub const fn seen_question_ids(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Answers in submission order.
    pub fn history(&self) -> &[AnsweredRecord] {
        &self.history
    }

    /// Seconds left on the section clock.
    pub const fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Answers the section asks for.
    pub const fn required_count(&self) -> usize {
        self.rule.required_count
    }

    /// Read-only view of the section.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            section: self.section,
            status: self.status(),
            cursor: self.cursor,
            current_question: self.current_question().cloned(),
            answered: self.history.len(),
            required_count: self.rule.required_count,
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Snapshot of the completed section, or `None` while it is not completed.
    pub fn result(&self) -> Option<SectionResult> {
        let reason = self.completion_reason()?;
        Some(SectionResult {
            section: self.section,
            history: self.history.clone(),
            score_estimate: quick_scaled_score(&self.history),
            time_taken_seconds: self
                .rule
                .time_limit_seconds
                .saturating_sub(self.remaining_seconds),
            completion_reason: reason,
            required_count: self.rule.required_count,
            cursor_trajectory: self.cursor_trajectory.clone(),
            completed_at: self.completed_at.unwrap_or_else(Utc::now),
        })
    }
}
