//! Adaptest Report Generation
//!
//! This crate turns the results of a mock exam or a single section into a
//! report. Reports can be serialized to JSON for programmatic access or
//! rendered to Markdown for the test-taker.
//!
//! The crate does not depend on the engine. Callers describe what happened
//! with a plain [`ReportInput`] and [`Report::from_input`] derives the
//! summary, per-section breakdown, per-difficulty accuracy and
//! recommendations.
//!
//! # Output
//!
//! - [`Report::to_json`] - Pretty-printed JSON, written to disk by [`Report::write_json`]
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports
//!
//! # Example
//!
//! ```rust
//! use adaptest_report::{AnswerInput, ReportInput, SectionInput, SectionOutcome, Report};
//!
//! let input = ReportInput {
//!     title: "Practice mock".to_string(),
//!     expected_sections: 1,
//!     total_scaled_score: None,
//!     sections: vec![SectionInput {
//!         name: "Verbal".to_string(),
//!         required_count: 2,
//!         scaled_score: 83,
//!         quick_score: 75,
//!         accuracy: 75.0,
//!         outcome: SectionOutcome::RequiredCountReached,
//!         time_taken_seconds: 240,
//!         answers: vec![
//!             AnswerInput::new("v-1", 3, true),
//!             AnswerInput::new("v-2", 4, false),
//!         ],
//!         difficulty_trajectory: vec![3, 4, 3],
//!     }],
//! };
//!
//! let report = Report::from_input(&input).unwrap();
//! assert!(report.to_json().unwrap().contains("Verbal"));
//! assert_eq!(report.file_name("md"), "adaptest-practice-mock.md");
//! ```

mod markdown;

pub use markdown::MarkdownGenerator;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest difficulty bucket.
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest difficulty bucket.
pub const MAX_DIFFICULTY: u8 = 5;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Report Status
// ============================================================================

/// Overall state of the exam the report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every expected section finished and the exam was scored.
    Completed,
    /// Some sections are missing or the exam was not scored.
    #[default]
    Incomplete,
    /// No answer was recorded at all.
    NoAnswers,
}

impl ReportStatus {
    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Completed => "All sections completed and scored",
            Self::Incomplete => "Exam incomplete",
            Self::NoAnswers => "No answers recorded",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// How a section ended.
///
/// Mirrors the engine's completion reasons so that this crate stays
/// independent of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOutcome {
    /// All required questions were answered.
    RequiredCountReached,
    /// The section clock ran out.
    TimeExpired,
    /// The pool ran out of fresh questions.
    PoolExhausted,
}

impl SectionOutcome {
    /// Returns a human-readable description of the outcome.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::RequiredCountReached => "Completed",
            Self::TimeExpired => "Time expired",
            Self::PoolExhausted => "Out of questions",
        }
    }
}

impl std::fmt::Display for SectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Report Input
// ============================================================================

/// Everything a report is derived from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    /// Report title.
    pub title: String,
    /// Number of sections the exam was meant to have.
    pub expected_sections: usize,
    /// Total scaled score, present once the exam was scored.
    pub total_scaled_score: Option<u16>,
    /// Completed sections in the order they ran.
    pub sections: Vec<SectionInput>,
}

/// One completed section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    /// Display name of the section.
    pub name: String,
    /// Answers the section asked for.
    pub required_count: usize,
    /// Bucketed section scaled score.
    pub scaled_score: u8,
    /// Linear quick score.
    pub quick_score: u8,
    /// Difficulty-weighted accuracy in percent.
    pub accuracy: f64,
    /// How the section ended.
    pub outcome: SectionOutcome,
    /// Seconds used.
    pub time_taken_seconds: u32,
    /// Answers in submission order.
    pub answers: Vec<AnswerInput>,
    /// Difficulty cursor after each answer, starting with the initial cursor.
    pub difficulty_trajectory: Vec<u8>,
}

/// One graded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    /// Question identifier.
    pub question_id: String,
    /// Difficulty of the question, 1 to 5.
    pub difficulty: u8,
    /// Whether the answer was correct.
    pub is_correct: bool,
}

impl AnswerInput {
    /// Creates a graded answer.
    #[must_use]
    pub fn new(question_id: impl Into<String>, difficulty: u8, is_correct: bool) -> Self {
        Self {
            question_id: question_id.into(),
            difficulty,
            is_correct,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Complete exam report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Report title.
    pub title: String,

    /// High-level summary.
    pub summary: ReportSummary,

    /// Per-section breakdown in the order the sections ran.
    pub sections: Vec<SectionBreakdown>,

    /// Accuracy per difficulty bucket across all sections.
    pub difficulty_stats: Vec<DifficultyStat>,

    /// Study recommendations, weakest section first.
    pub recommendations: Vec<Recommendation>,

    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    /// Derives a full report from `input`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the title is blank or an answer
    /// has a difficulty outside 1 to 5.
    pub fn from_input(input: &ReportInput) -> Result<Self> {
        for section in &input.sections {
            if let Some(answer) = section
                .answers
                .iter()
                .find(|a| !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&a.difficulty))
            {
                return Err(ReportError::InvalidData(format!(
                    "answer '{}' in {} has difficulty {}",
                    answer.question_id, section.name, answer.difficulty
                )));
            }
        }

        let questions_answered = input.sections.iter().map(|s| s.answers.len()).sum();
        let status = if questions_answered == 0 {
            ReportStatus::NoAnswers
        } else if input.total_scaled_score.is_some()
            && input.sections.len() >= input.expected_sections
        {
            ReportStatus::Completed
        } else {
            ReportStatus::Incomplete
        };

        let summary = ReportSummary {
            status,
            total_scaled_score: input.total_scaled_score,
            duration_seconds: input
                .sections
                .iter()
                .map(|s| u64::from(s.time_taken_seconds))
                .sum(),
            sections_completed: input.sections.len(),
            sections_expected: input.expected_sections,
            questions_answered,
        };

        let sections: Vec<SectionBreakdown> = input
            .sections
            .iter()
            .map(SectionBreakdown::from_input)
            .collect();

        Self::builder()
            .title(&input.title)
            .summary(summary)
            .difficulty_stats(difficulty_stats(&input.sections))
            .recommendations(recommendations(&sections))
            .sections(sections)
            .build()
    }

    /// Serializes the report to JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// File name for this report with the given extension.
    ///
    /// The title is lowercased and every run of other characters becomes a
    /// single `-`, so "Mock 1: Week 3" gives `adaptest-mock-1-week-3.md`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        let mut slug = String::with_capacity(self.title.len());
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');
        let slug = if slug.is_empty() { "report" } else { slug };
        format!("adaptest-{slug}.{extension}")
    }

    /// Writes the report as pretty JSON into `dir` and returns the path.
    ///
    /// The directory must exist; an existing file of the same name is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    /// Returns [`ReportError::Io`] if the file cannot be written.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name("json"));
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }

    /// Returns the section with the lowest scaled score.
    #[must_use]
    pub fn weakest_section(&self) -> Option<&SectionBreakdown> {
        self.sections.iter().min_by(|a, b| weakness_order(a, b))
    }
}

// ============================================================================
// ReportBuilder
// ============================================================================

/// Builder for constructing [`Report`] instances.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    summary: Option<ReportSummary>,
    sections: Vec<SectionBreakdown>,
    difficulty_stats: Vec<DifficultyStat>,
    recommendations: Vec<Recommendation>,
}

impl ReportBuilder {
    /// Sets the report title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the report summary.
    #[must_use]
    pub fn summary(mut self, summary: ReportSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Sets all section breakdowns at once.
    #[must_use]
    pub fn sections(mut self, sections: Vec<SectionBreakdown>) -> Self {
        self.sections = sections;
        self
    }

    /// Sets the per-difficulty statistics.
    #[must_use]
    pub fn difficulty_stats(mut self, stats: Vec<DifficultyStat>) -> Self {
        self.difficulty_stats = stats;
        self
    }

    /// Sets all recommendations at once.
    #[must_use]
    pub fn recommendations(mut self, recs: Vec<Recommendation>) -> Self {
        self.recommendations = recs;
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the title or summary is missing.
    pub fn build(self) -> Result<Report> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ReportError::InvalidData("title is required".to_string()))?;

        let summary = self
            .summary
            .ok_or_else(|| ReportError::InvalidData("summary is required".to_string()))?;

        Ok(Report {
            title,
            summary,
            sections: self.sections,
            difficulty_stats: self.difficulty_stats,
            recommendations: self.recommendations,
            generated_at: Utc::now(),
        })
    }
}

// ============================================================================
// ReportSummary
// ============================================================================

/// High-level summary of the exam.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Overall state of the exam.
    pub status: ReportStatus,

    /// Total scaled score, if the exam was scored.
    pub total_scaled_score: Option<u16>,

    /// Seconds used across all sections.
    pub duration_seconds: u64,

    /// Sections that completed.
    pub sections_completed: usize,

    /// Sections the exam was meant to have.
    pub sections_expected: usize,

    /// Answers recorded across all sections.
    pub questions_answered: usize,
}

// ============================================================================
// SectionBreakdown
// ============================================================================

/// Results of one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionBreakdown {
    /// Display name of the section.
    pub name: String,
    /// Answers recorded.
    pub answered: usize,
    /// Answers the section asked for.
    pub required: usize,
    /// Correct answers.
    pub correct: usize,
    /// Difficulty-weighted accuracy in percent.
    pub accuracy: f64,
    /// Bucketed section scaled score.
    pub scaled_score: u8,
    /// Linear quick score.
    pub quick_score: u8,
    /// How the section ended.
    pub outcome: SectionOutcome,
    /// Seconds used.
    pub time_taken_seconds: u32,
    /// Difficulty cursor after each answer.
    pub difficulty_trajectory: Vec<u8>,
}

impl SectionBreakdown {
    fn from_input(input: &SectionInput) -> Self {
        Self {
            name: input.name.clone(),
            answered: input.answers.len(),
            required: input.required_count,
            correct: input.answers.iter().filter(|a| a.is_correct).count(),
            accuracy: input.accuracy,
            scaled_score: input.scaled_score,
            quick_score: input.quick_score,
            outcome: input.outcome,
            time_taken_seconds: input.time_taken_seconds,
            difficulty_trajectory: input.difficulty_trajectory.clone(),
        }
    }

    /// Highest difficulty the cursor reached.
    #[must_use]
    pub fn peak_difficulty(&self) -> Option<u8> {
        self.difficulty_trajectory.iter().copied().max()
    }
}

/// Orders sections weakest first: lower scaled score, then lower accuracy.
fn weakness_order(a: &SectionBreakdown, b: &SectionBreakdown) -> std::cmp::Ordering {
    a.scaled_score
        .cmp(&b.scaled_score)
        .then_with(|| a.accuracy.total_cmp(&b.accuracy))
}

// ============================================================================
// DifficultyStat
// ============================================================================

/// Answer counts for one difficulty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyStat {
    /// Difficulty bucket.
    pub difficulty: u8,
    /// Answers at this difficulty.
    pub answered: usize,
    /// Correct answers at this difficulty.
    pub correct: usize,
}

impl DifficultyStat {
    /// Accuracy in percent, `0.0` when nothing was answered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        if self.answered == 0 {
            return 0.0;
        }
        self.correct as f64 / self.answered as f64 * 100.0
    }
}

fn difficulty_stats(sections: &[SectionInput]) -> Vec<DifficultyStat> {
    let mut buckets: BTreeMap<u8, DifficultyStat> = BTreeMap::new();
    for answer in sections.iter().flat_map(|s| &s.answers) {
        let stat = buckets.entry(answer.difficulty).or_insert(DifficultyStat {
            difficulty: answer.difficulty,
            answered: 0,
            correct: 0,
        });
        stat.answered += 1;
        if answer.is_correct {
            stat.correct += 1;
        }
    }
    buckets.into_values().collect()
}

// ============================================================================
// Recommendation
// ============================================================================

/// A prioritized study recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority of this recommendation (1 = highest priority).
    pub priority: u32,

    /// Category of the recommendation (e.g., "accuracy", "pacing", "coverage").
    pub category: String,

    /// Detailed description of the recommended focus.
    pub description: String,
}

impl Recommendation {
    /// Creates a new recommendation.
    #[must_use]
    pub fn new(priority: u32, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.into(),
            description: description.into(),
        }
    }
}

/// Scaled score below which a section needs fundamentals work.
const FOUNDATION_THRESHOLD: u8 = 75;

/// Scaled score below which a section needs targeted practice.
const PRACTICE_THRESHOLD: u8 = 83;

fn recommendations(sections: &[SectionBreakdown]) -> Vec<Recommendation> {
    let mut ordered: Vec<&SectionBreakdown> = sections.iter().collect();
    ordered.sort_by(|a, b| weakness_order(a, b));

    let mut recs = Vec::new();
    let mut priority = 1;
    let mut push = |category: &str, description: String| {
        recs.push(Recommendation::new(priority, category, description));
        priority += 1;
    };

    for section in ordered {
        let name = &section.name;
        let score = section.scaled_score;
        if score < FOUNDATION_THRESHOLD {
            push(
                "accuracy",
                format!("{name}: scored {score}. Rebuild fundamentals with easy and medium questions before timed practice."),
            );
        } else if score < PRACTICE_THRESHOLD {
            push(
                "accuracy",
                format!("{name}: scored {score}. Drill medium and hard questions to push accuracy above 75%."),
            );
        }

        match section.outcome {
            SectionOutcome::TimeExpired => push(
                "pacing",
                format!(
                    "{name}: time ran out after {} of {} questions. Practice with a per-question time budget.",
                    section.answered, section.required
                ),
            ),
            SectionOutcome::PoolExhausted => push(
                "coverage",
                format!(
                    "{name}: the question pool ran out after {} questions. Add more questions before the next attempt.",
                    section.answered
                ),
            ),
            SectionOutcome::RequiredCountReached => {}
        }
    }

    recs
}

// ============================================================================
// Tests
// ============================================================================
