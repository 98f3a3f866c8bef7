//! Adaptive next-question selection.
//!
//! The selector draws uniformly among unseen questions at the target
//! difficulty. When that bucket is empty it falls back to the untried bucket
//! closest to the original target, preferring the easier bucket on ties,
//! until every bucket has been tried once.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::question::{Difficulty, QuestionDescriptor, Section};

/// Outcome of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A fresh question was found.
    Selected(QuestionDescriptor),
    /// No unseen valid question exists at any difficulty.
    Exhausted,
}

impl Selection {
    /// Returns the selected question, if any.
    #[must_use]
    pub fn question(self) -> Option<QuestionDescriptor> {
        match self {
            Self::Selected(q) => Some(q),
            Self::Exhausted => None,
        }
    }

    /// Returns `true` if the pool is exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Selects the next question for `section`.
///
/// `target` is coerced to [`Difficulty::MEDIUM`] when outside `1..=5`.
/// Descriptors from other sections, with blank ids, or with out-of-range
/// difficulties are ignored, as are ids in `excluded`.
pub fn select_next<R: Rng + ?Sized>(
    section: Section,
    target: i64,
    excluded: &HashSet<String>,
    pool: &[QuestionDescriptor],
    rng: &mut R,
) -> Selection {
    let original = Difficulty::new(target).unwrap_or_else(|| {
        warn!(%section, target, "Difficulty target out of range; using medium");
        Difficulty::MEDIUM
    });

    let mut tried: Vec<Difficulty> = Vec::with_capacity(5);
    let mut current = original;

    loop {
        let candidates: Vec<&QuestionDescriptor> = pool
            .iter()
            .filter(|q| q.is_valid_for(section))
            .filter(|q| q.difficulty() == Some(current))
            .filter(|q| !excluded.contains(&q.id))
            .collect();

        if let Some(chosen) = candidates.choose(rng) {
            debug!(
                %section,
                question_id = %chosen.id,
                difficulty = %current,
                target = %original,
                candidates = candidates.len(),
                "Selected question"
            );
            return Selection::Selected((*chosen).clone());
        }

        tried.push(current);
        match nearest_untried(original, &tried) {
            Some(next) => {
                debug!(%section, from = %current, to = %next, "Bucket empty; trying nearest difficulty");
                current = next;
            }
            None => {
                warn!(%section, target = %original, excluded = excluded.len(), "Question pool exhausted");
                return Selection::Exhausted;
            }
        }
    }
}

/// Finds the untried bucket closest to `original`.
///
/// Scans 1 to 5 and keeps the first strictly closer bucket, so the lower
/// bucket wins ties.
fn nearest_untried(original: Difficulty, tried: &[Difficulty]) -> Option<Difficulty> {
    let mut best: Option<Difficulty> = None;
    for candidate in Difficulty::all() {
        if tried.contains(&candidate) {
            continue;
        }
        let closer = match best {
            Some(b) => candidate.distance(original) < b.distance(original),
            None => true,
        };
        if closer {
            best = Some(candidate);
        }
    }
    best
}
