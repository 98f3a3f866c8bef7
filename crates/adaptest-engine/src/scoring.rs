//! Section and total scaled scoring.
//!
//! Two scoring paths exist and are deliberately kept apart:
//!
//! - **Bucketed**: difficulty-weighted accuracy is mapped to a section score
//!   through a step table, and section scores are averaged and looked up in
//!   a total-score table. Used for full mock exams.
//! - **Quick**: `round(60 + earned / max * 30)`, clamped to `60..=90`. Used
//!   when a single section's answers are scored on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::question::{AnsweredRecord, Difficulty, Section};
use crate::session::SectionResult;

/// Lowest section scaled score.
pub const MIN_SECTION_SCORE: u8 = 60;

/// Highest section scaled score.
pub const MAX_SECTION_SCORE: u8 = 90;

/// Accuracy thresholds (percent) and the section score awarded at or above each.
const SECTION_SCORE_THRESHOLDS: [(f64, u8); 12] = [
    (95.0, 90),
    (90.0, 89),
    (85.0, 87),
    (80.0, 85),
    (75.0, 83),
    (70.0, 81),
    (60.0, 79),
    (50.0, 77),
    (40.0, 74),
    (30.0, 71),
    (20.0, 67),
    (10.0, 64),
];

/// Average section score and the total score awarded at or above it.
const TOTAL_SCORE_TABLE: [(u8, u16); 13] = [
    (60, 455),
    (64, 495),
    (67, 525),
    (71, 565),
    (74, 595),
    (77, 625),
    (79, 645),
    (81, 665),
    (83, 685),
    (85, 705),
    (87, 735),
    (89, 765),
    (90, 785),
];

/// A graded answer supplied from outside a session.
pub trait GradedAnswer {
    /// Difficulty of the answered question.
    fn difficulty(&self) -> Difficulty;
    /// Whether the answer was graded correct.
    fn is_correct(&self) -> bool;
}

impl GradedAnswer for AnsweredRecord {
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    fn is_correct(&self) -> bool {
        self.is_correct
    }
}

/// A bare graded answer, as read from an exported answer log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graded {
    /// Difficulty of the answered question.
    pub difficulty: Difficulty,
    /// Whether the answer was graded correct.
    pub is_correct: bool,
}

impl GradedAnswer for Graded {
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    fn is_correct(&self) -> bool {
        self.is_correct
    }
}

/// Difficulty-weighted totals of a set of answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedTotals {
    /// Sum of difficulties over correct answers.
    pub earned: u32,
    /// Sum of difficulties over all answers.
    pub max: u32,
    /// Number of correct answers.
    pub correct_count: usize,
    /// Number of answers.
    pub total_count: usize,
}

impl WeightedTotals {
    /// Weighted accuracy in percent, `0.0` when there is nothing to weigh.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(self.earned, self.max)
    }
}

/// Sums difficulty weights over `answers`.
pub fn weighted_totals<A: GradedAnswer>(answers: &[A]) -> WeightedTotals {
    answers
        .iter()
        .fold(WeightedTotals::default(), |mut totals, answer| {
            let weight = u32::from(answer.difficulty());
            totals.max += weight;
            totals.total_count += 1;
            if answer.is_correct() {
                totals.earned += weight;
                totals.correct_count += 1;
            }
            totals
        })
}

/// Weighted accuracy in percent.
///
/// Returns `0.0` when `max` is zero.
#[must_use]
pub fn accuracy(earned: u32, max: u32) -> f64 {
    if max == 0 {
        return 0.0;
    }
    f64::from(earned) / f64::from(max) * 100.0
}

/// Maps an accuracy percentage to a section scaled score.
///
/// A step function over fixed thresholds; anything below 10% scores 60.
#[must_use]
pub fn scaled_score_from_accuracy(accuracy: f64) -> u8 {
    SECTION_SCORE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| accuracy >= *threshold)
        .map_or(MIN_SECTION_SCORE, |(_, score)| *score)
}

/// Maps section scaled scores to a total scaled score.
///
/// The scores are averaged and rounded to the nearest integer, then the
/// highest table key not above the average is used. Averages below the
/// lowest key, and an empty input, map to the lowest total.
#[must_use]
pub fn total_scaled_score(section_scores: &[u8]) -> u16 {
    let lowest = TOTAL_SCORE_TABLE[0].1;
    if section_scores.is_empty() {
        return lowest;
    }

    let sum: u32 = section_scores.iter().map(|s| u32::from(*s)).sum();
    #[allow(clippy::cast_precision_loss)]
    let average = (f64::from(sum) / section_scores.len() as f64).round();

    TOTAL_SCORE_TABLE
        .iter()
        .rev()
        .find(|(key, _)| f64::from(*key) <= average)
        .map_or(lowest, |(_, total)| *total)
}

/// Quick linear section score for a single answer log.
///
/// `round(60 + earned / max * 30)`, clamped to `60..=90`; an empty log scores 60.
pub fn quick_scaled_score<A: GradedAnswer>(answers: &[A]) -> u8 {
    let totals = weighted_totals(answers);
    if totals.max == 0 {
        return MIN_SECTION_SCORE;
    }
    let raw = (f64::from(MIN_SECTION_SCORE)
        + f64::from(totals.earned) / f64::from(totals.max) * 30.0)
        .round()
        .clamp(f64::from(MIN_SECTION_SCORE), f64::from(MAX_SECTION_SCORE));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = raw as u8;
    score
}

/// Score of one section within a [`ScoreResult`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScore {
    /// Weighted accuracy in percent.
    pub accuracy: f64,
    /// Bucketed section scaled score.
    pub scaled_score: u8,
    /// Number of correct answers.
    pub correct_count: usize,
    /// Number of answers.
    pub total_count: usize,
}

impl SectionScore {
    /// Scores a set of graded answers with the bucketed path.
    pub fn from_answers<A: GradedAnswer>(answers: &[A]) -> Self {
        let totals = weighted_totals(answers);
        let accuracy = totals.accuracy();
        Self {
            accuracy,
            scaled_score: scaled_score_from_accuracy(accuracy),
            correct_count: totals.correct_count,
            total_count: totals.total_count,
        }
    }
}

/// Per-section and total scores of a completed mock exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Scores keyed by section.
    pub per_section: BTreeMap<Section, SectionScore>,
    /// Total scaled score across sections.
    pub total_scaled_score: u16,
}

impl ScoreResult {
    /// Scores completed sections with the bucketed path.
    ///
    /// A section appearing more than once keeps its last result.
    #[must_use]
    pub fn from_results(results: &[SectionResult]) -> Self {
        let per_section: BTreeMap<Section, SectionScore> = results
            .iter()
            .map(|r| (r.section, SectionScore::from_answers(&r.history)))
            .collect();
        let scores: Vec<u8> = per_section.values().map(|s| s.scaled_score).collect();
        Self {
            total_scaled_score: total_scaled_score(&scores),
            per_section,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn graded(difficulty: i64, is_correct: bool) -> Graded {
        Graded {
            difficulty: Difficulty::new(difficulty).unwrap(),
            is_correct,
        }
    }

    #[test]
    fn test_accuracy_zero_max() {
        assert_eq!(accuracy(0, 0), 0.0);
        assert_eq!(weighted_totals::<Graded>(&[]).accuracy(), 0.0);
    }

    #[test]
    fn test_accuracy_example() {
        assert_eq!(accuracy(60, 80), 75.0);
        assert_eq!(scaled_score_from_accuracy(accuracy(60, 80)), 83);
    }

    #[test]
    fn test_weighted_totals() {
        let answers = vec![graded(5, true), graded(1, false), graded(3, true)];
        let totals = weighted_totals(&answers);
        assert_eq!(totals.earned, 8);
        assert_eq!(totals.max, 9);
        assert_eq!(totals.correct_count, 2);
        assert_eq!(totals.total_count, 3);
    }

    #[test]
    fn test_scaled_score_breakpoints() {
        assert_eq!(scaled_score_from_accuracy(100.0), 90);
        assert_eq!(scaled_score_from_accuracy(95.0), 90);
        assert_eq!(scaled_score_from_accuracy(94.9), 89);
        assert_eq!(scaled_score_from_accuracy(90.0), 89);
        assert_eq!(scaled_score_from_accuracy(85.0), 87);
        assert_eq!(scaled_score_from_accuracy(80.0), 85);
        assert_eq!(scaled_score_from_accuracy(75.0), 83);
        assert_eq!(scaled_score_from_accuracy(70.0), 81);
        assert_eq!(scaled_score_from_accuracy(69.9), 79);
        assert_eq!(scaled_score_from_accuracy(60.0), 79);
        assert_eq!(scaled_score_from_accuracy(50.0), 77);
        assert_eq!(scaled_score_from_accuracy(40.0), 74);
        assert_eq!(scaled_score_from_accuracy(30.0), 71);
        assert_eq!(scaled_score_from_accuracy(20.0), 67);
        assert_eq!(scaled_score_from_accuracy(10.0), 64);
        assert_eq!(scaled_score_from_accuracy(9.9), 60);
        assert_eq!(scaled_score_from_accuracy(0.0), 60);
    }

    #[test]
    fn test_total_floor_lookup() {
        assert_eq!(total_scaled_score(&[81, 83, 85]), 685);
        assert_eq!(total_scaled_score(&[90, 90, 90]), 785);
        assert_eq!(total_scaled_score(&[60, 60, 60]), 455);
        // Average 82 is between keys 81 and 83: floor to 81.
        assert_eq!(total_scaled_score(&[81, 81, 84]), 665);
        // Average 62.67 rounds to 63, floors to key 60.
        assert_eq!(total_scaled_score(&[60, 64, 64]), 455);
        // Average 63.67 rounds to 64.
        assert_eq!(total_scaled_score(&[64, 64, 63]), 495);
    }

    #[test]
    fn test_total_below_table_uses_lowest() {
        assert_eq!(total_scaled_score(&[10, 20, 30]), 455);
        assert_eq!(total_scaled_score(&[]), 455);
    }

    #[test]
    fn test_quick_scaled_score() {
        assert_eq!(quick_scaled_score::<Graded>(&[]), 60);
        assert_eq!(quick_scaled_score(&[graded(3, true)]), 90);
        assert_eq!(quick_scaled_score(&[graded(3, false)]), 60);
        // 4 / 8 * 30 = 15 -> 75
        assert_eq!(quick_scaled_score(&[graded(4, true), graded(4, false)]), 75);
        // 1 / 3 * 30 = 10 -> 70
        assert_eq!(quick_scaled_score(&[graded(1, true), graded(2, false)]), 70);
    }

    #[test]
    fn test_quick_and_bucketed_paths_differ() {
        let answers = vec![graded(3, true), graded(3, true), graded(3, true), graded(3, false)];
        // 75% accuracy: bucketed 83, quick round(60 + 22.5) = 83 (round half away).
        assert_eq!(SectionScore::from_answers(&answers).scaled_score, 83);
        assert_eq!(quick_scaled_score(&answers), 83);

        let answers = vec![graded(5, true), graded(5, false)];
        // 50%: bucketed 77, quick 75.
        assert_eq!(SectionScore::from_answers(&answers).scaled_score, 77);
        assert_eq!(quick_scaled_score(&answers), 75);
    }

    #[test]
    fn test_section_score_from_answers() {
        let answers = vec![graded(5, true), graded(5, true), graded(2, false)];
        let score = SectionScore::from_answers(&answers);
        assert_eq!(score.correct_count, 2);
        assert_eq!(score.total_count, 3);
        assert!((score.accuracy - 83.333).abs() < 0.01);
        assert_eq!(score.scaled_score, 85);
    }

    #[test]
    fn test_score_result_serialization() {
        let mut per_section = BTreeMap::new();
        per_section.insert(
            Section::Verbal,
            SectionScore {
                accuracy: 50.0,
                scaled_score: 77,
                correct_count: 1,
                total_count: 2,
            },
        );
        let result = ScoreResult {
            per_section,
            total_scaled_score: 625,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""perSection":{"verbal":"#));
        assert!(json.contains(r#""scaledScore":77"#));
        assert!(json.contains(r#""totalScaledScore":625"#));

        let back: ScoreResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
