//! Outbound results.
//!
//! Completed sections and finalized mocks are reported to a [`ResultSink`]
//! as a [`ResultPayload`]. Persistence is up to the sink.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::question::{AnsweredRecord, Section};
use crate::scoring::ScoreResult;
use crate::session::SectionResult;

/// `testType` of a full mock exam payload.
pub const MOCK_TEST_TYPE: &str = "mock";

/// Result record handed to a persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    /// Answers in submission order.
    pub answers: Vec<AnsweredRecord>,
    /// Quick scaled score for a section, total scaled score for a mock.
    pub score: u16,
    /// Seconds used.
    pub time_taken_seconds: u32,
    /// Section key, or [`MOCK_TEST_TYPE`].
    pub test_type: String,
}

impl ResultPayload {
    /// Payload for one completed section.
    #[must_use]
    pub fn from_section(result: &SectionResult) -> Self {
        Self {
            answers: result.history.clone(),
            score: u16::from(result.score_estimate),
            time_taken_seconds: result.time_taken_seconds,
            test_type: result.section.key().to_string(),
        }
    }

    /// Payload for a finalized mock exam.
    #[must_use]
    pub fn from_mock(results: &[SectionResult], score: &ScoreResult) -> Self {
        Self {
            answers: results
                .iter()
                .flat_map(|r| r.history.iter().cloned())
                .collect(),
            score: score.total_scaled_score,
            time_taken_seconds: results.iter().map(|r| r.time_taken_seconds).sum(),
            test_type: MOCK_TEST_TYPE.to_string(),
        }
    }
}

impl SectionResult {
    /// Outbound payload for this section.
    #[must_use]
    pub fn payload(&self) -> ResultPayload {
        ResultPayload::from_section(self)
    }
}

/// Destination for results and attempt counters.
pub trait ResultSink: Send + Sync {
    /// Stores a finished result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result could not be stored.
    fn record_result(&self, payload: &ResultPayload) -> Result<()>;

    /// Counts one more attempt at `section`.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter could not be updated.
    fn increment_attempts(&self, section: Section) -> Result<()>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn record_result(&self, _payload: &ResultPayload) -> Result<()> {
        Ok(())
    }

    fn increment_attempts(&self, _section: Section) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<ResultPayload>>,
    attempts: Mutex<BTreeMap<Section, u32>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Results recorded so far.
    pub fn results(&self) -> Vec<ResultPayload> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attempts counted for `section`.
    pub fn attempts(&self, section: Section) -> u32 {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&section)
            .copied()
            .unwrap_or(0)
    }
}

impl ResultSink for MemorySink {
    fn record_result(&self, payload: &ResultPayload) -> Result<()> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        Ok(())
    }

    fn increment_attempts(&self, section: Section) -> Result<()> {
        *self
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(section)
            .or_insert(0) += 1;
        Ok(())
    }
}
