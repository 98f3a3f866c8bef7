//! Question identity, difficulty and answer records.
//!
//! The engine never looks at question content. A [`QuestionDescriptor`]
//! carries only what selection needs: an opaque id, the section it belongs
//! to, and a difficulty bucket.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Section
// ============================================================================

/// A scored division of the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// Quantitative Reasoning.
    Quantitative,
    /// Verbal Reasoning.
    Verbal,
    /// Data Insights.
    DataInsights,
}

impl Section {
    /// All sections in default exam order.
    pub const ALL: [Self; 3] = [Self::Quantitative, Self::Verbal, Self::DataInsights];

    /// Parses a section name case-insensitively, accepting short aliases.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "quantitative" | "quant" | "q" => Some(Self::Quantitative),
            "verbal" | "v" => Some(Self::Verbal),
            "data_insights" | "data-insights" | "datainsights" | "data insights" | "di" => {
                Some(Self::DataInsights)
            }
            _ => None,
        }
    }

    /// Machine-readable name used in JSON and result payloads.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Quantitative => "quantitative",
            Self::Verbal => "verbal",
            Self::DataInsights => "data_insights",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantitative => write!(f, "Quantitative"),
            Self::Verbal => write!(f, "Verbal"),
            Self::DataInsights => write!(f, "Data Insights"),
        }
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid section '{s}': expected one of 'quantitative', 'verbal', 'data_insights'"
            ))
        })
    }
}

impl Serialize for Section {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

// ============================================================================
// Difficulty
// ============================================================================

/// A validated difficulty bucket in `1..=5`.
///
/// Also used as the adaptive cursor of a section: it moves one step per
/// answer and never leaves the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    /// Easiest bucket.
    pub const MIN: Self = Self(1);
    /// Starting bucket for every section.
    pub const MEDIUM: Self = Self(3);
    /// Hardest bucket.
    pub const MAX: Self = Self(5);

    /// Returns the difficulty if `value` is in `1..=5`.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN.0..=Self::MAX.0).contains(v))
            .map(Self)
    }

    /// Returns the difficulty for `value`, replacing anything out of range
    /// with [`Difficulty::MEDIUM`].
    #[must_use]
    pub fn coerce(value: i64) -> Self {
        Self::new(value).unwrap_or(Self::MEDIUM)
    }

    /// One step harder, saturating at [`Difficulty::MAX`].
    #[must_use]
    pub const fn harder(self) -> Self {
        if self.0 >= Self::MAX.0 {
            Self::MAX
        } else {
            Self(self.0 + 1)
        }
    }

    /// One step easier, saturating at [`Difficulty::MIN`].
    #[must_use]
    pub const fn easier(self) -> Self {
        if self.0 <= Self::MIN.0 {
            Self::MIN
        } else {
            Self(self.0 - 1)
        }
    }

    /// All buckets in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }

    /// The raw bucket value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Absolute distance between two buckets.
    #[must_use]
    pub const fn distance(self, other: Self) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("difficulty {value} is outside 1..=5"))
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

impl From<Difficulty> for u32 {
    fn from(d: Difficulty) -> Self {
        Self::from(d.0)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// QuestionDescriptor
// ============================================================================

/// Identity and selection metadata of a question.
///
/// `difficulty` is kept as the raw integer supplied by the question store so
/// that malformed descriptors survive loading and are rejected by the
/// selector instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionDescriptor {
    /// Opaque unique token.
    pub id: String,
    /// Section the question belongs to.
    pub section: Section,
    /// Raw difficulty, valid when in `1..=5`.
    pub difficulty: i64,
}

impl QuestionDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, section: Section, difficulty: i64) -> Self {
        Self {
            id: id.into(),
            section,
            difficulty,
        }
    }

    /// Returns the validated difficulty, or `None` if it is out of range.
    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        Difficulty::new(self.difficulty)
    }

    /// Returns `true` if the descriptor can be offered in `section`.
    ///
    /// The id must be non-blank, the difficulty must be in `1..=5` and the
    /// section must match.
    #[must_use]
    pub fn is_valid_for(&self, section: Section) -> bool {
        !self.id.trim().is_empty() && self.difficulty().is_some() && self.section == section
    }
}

// ============================================================================
// AnsweredRecord
// ============================================================================

/// One submitted answer within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredRecord {
    /// Id of the question that was answered.
    pub question_id: String,
    /// Difficulty of the question at answer time.
    pub difficulty: Difficulty,
    /// Correctness supplied by the external grading step.
    pub is_correct: bool,
    /// When the answer was submitted.
    pub answered_at: DateTime<Utc>,
}

impl AnsweredRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(question_id: impl Into<String>, difficulty: Difficulty, is_correct: bool) -> Self {
        Self {
            question_id: question_id.into(),
            difficulty,
            is_correct,
            answered_at: Utc::now(),
        }
    }
}
