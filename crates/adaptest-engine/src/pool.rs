//! Question pools supplied to the engine.
//!
//! The pool is an external, read-only collaborator. The engine asks it for
//! the descriptors of one section when that section starts and never
//! refreshes them mid-section.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::question::{Difficulty, QuestionDescriptor, Section};

/// Source of question descriptors, one section at a time.
pub trait QuestionPool: Send + Sync {
    /// Returns every descriptor the pool holds for `section`.
    fn for_section(&self, section: Section) -> Vec<QuestionDescriptor>;
}

/// A pool held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPool {
    questions: Vec<QuestionDescriptor>,
}

/// A pool entry as it appears in an exported JSON file.
///
/// Every field is optional so that one bad entry does not reject the file.
#[derive(Debug, Deserialize)]
struct PoolEntry {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    difficulty: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PoolFile {
    Wrapped { questions: Vec<PoolEntry> },
    Bare(Vec<PoolEntry>),
}

impl InMemoryPool {
    /// Creates a pool from the given descriptors.
    #[must_use]
    pub fn new(questions: Vec<QuestionDescriptor>) -> Self {
        Self { questions }
    }

    /// Loads a pool from a JSON file.
    ///
    /// Accepts either a bare array of questions or an object with a
    /// `questions` array. Entries without an id or with an unknown section
    /// are skipped. Difficulties that are not integers are kept as `0` so
    /// that the selector rejects them.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PoolNotFound` if the file does not exist and
    /// `EngineError::PoolParseError` if it is not valid pool JSON.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::pool_not_found(path));
            }
            Err(e) => return Err(EngineError::Io(e)),
        };

        let file: PoolFile = serde_json::from_str(&contents)
            .map_err(|e| EngineError::pool_parse(path, e.to_string()))?;
        let entries = match file {
            PoolFile::Wrapped { questions } => questions,
            PoolFile::Bare(questions) => questions,
        };

        let total = entries.len();
        let questions: Vec<QuestionDescriptor> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| entry_to_descriptor(index, entry))
            .collect();

        info!(
            path = %path.display(),
            loaded = questions.len(),
            skipped = total - questions.len(),
            "Loaded question pool"
        );
        Ok(Self { questions })
    }

    /// Number of descriptors in the pool, valid or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns `true` if the pool holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Counts descriptors per section and difficulty.
    #[must_use]
    pub fn summary(&self) -> PoolSummary {
        let mut summary = PoolSummary::default();
        for q in &self.questions {
            let counts = summary.sections.entry(q.section).or_default();
            match q.difficulty() {
                Some(d) if q.is_valid_for(q.section) => {
                    *counts.by_difficulty.entry(d.value()).or_default() += 1;
                    counts.valid += 1;
                }
                _ => counts.invalid += 1,
            }
        }
        summary
    }
}

impl QuestionPool for InMemoryPool {
    fn for_section(&self, section: Section) -> Vec<QuestionDescriptor> {
        self.questions
            .iter()
            .filter(|q| q.section == section)
            .cloned()
            .collect()
    }
}

fn entry_to_descriptor(index: usize, entry: PoolEntry) -> Option<QuestionDescriptor> {
    let id = match entry.id {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            warn!(index, "Skipping pool entry without an id");
            return None;
        }
    };

    let Some(section) = entry
        .section
        .as_deref()
        .and_then(Section::from_str_case_insensitive)
    else {
        warn!(index, %id, section = ?entry.section, "Skipping pool entry with unknown section");
        return None;
    };

    let difficulty = entry
        .difficulty
        .as_ref()
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);

    Some(QuestionDescriptor {
        id,
        section,
        difficulty,
    })
}

/// Per-section descriptor counts of a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    /// Counts keyed by section.
    pub sections: BTreeMap<Section, SectionCounts>,
}

/// Descriptor counts for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCounts {
    /// Valid descriptors.
    pub valid: usize,
    /// Descriptors the selector will never offer.
    pub invalid: usize,
    /// Valid descriptors keyed by difficulty bucket.
    pub by_difficulty: BTreeMap<u8, usize>,
}

impl PoolSummary {
    /// Returns the counts for `section`, or empty counts.
    #[must_use]
    pub fn section(&self, section: Section) -> SectionCounts {
        self.sections.get(&section).cloned().unwrap_or_default()
    }

    /// Returns the sections that hold fewer valid questions than `required`.
    #[must_use]
    pub fn short_sections(&self, required: impl Fn(Section) -> usize) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.section(*s).valid < required(*s))
            .collect()
    }

    /// Returns `true` if `section` has at least one valid question at `difficulty`.
    #[must_use]
    pub fn has_bucket(&self, section: Section, difficulty: Difficulty) -> bool {
        self.sections
            .get(&section)
            .and_then(|c| c.by_difficulty.get(&difficulty.value()))
            .is_some_and(|n| *n > 0)
    }
}
