//! Markdown report generation.
//!
//! [`MarkdownGenerator`] renders a [`Report`] as a document with:
//!
//! - A summary table with the total score
//! - A per-section breakdown
//! - Accuracy per difficulty bucket
//! - Prioritized recommendations
//!
//! # Example
//!
//! ```rust
//! use adaptest_report::{MarkdownGenerator, Report, ReportInput};
//!
//! let input = ReportInput {
//!     title: "Empty mock".to_string(),
//!     expected_sections: 3,
//!     ..ReportInput::default()
//! };
//! let report = Report::from_input(&input).unwrap();
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Adaptest Report: Empty mock"));
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{Report, SectionBreakdown};

/// Generates Markdown reports.
pub struct MarkdownGenerator<'a> {
    report: &'a Report,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_sections(&mut output);
        self.write_difficulty(&mut output);
        self.write_recommendations(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Adaptest Report: {}\n",
            escape_markdown(&self.report.title)
        );
    }

    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;
        let total = summary
            .total_scaled_score
            .map_or_else(|| "Not scored".to_string(), |s| s.to_string());

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Status | {} |", summary.status.description());
        let _ = writeln!(output, "| Total Score | {total} |");
        let _ = writeln!(
            output,
            "| Sections | {} of {} |",
            summary.sections_completed, summary.sections_expected
        );
        let _ = writeln!(output, "| Questions Answered | {} |", summary.questions_answered);
        let _ = writeln!(
            output,
            "| Time Taken | {} |",
            format_duration(summary.duration_seconds)
        );
        let _ = writeln!(output);
    }

    fn write_sections(&self, output: &mut String) {
        let _ = writeln!(output, "## Sections\n");

        if self.report.sections.is_empty() {
            let _ = writeln!(output, "*No sections completed.*\n");
            return;
        }

        let _ = writeln!(
            output,
            "| Section | Answered | Correct | Accuracy | Score | Quick Score | Outcome | Time |"
        );
        let _ = writeln!(
            output,
            "|---------|----------|---------|----------|-------|-------------|---------|------|"
        );
        for section in &self.report.sections {
            Self::write_section_row(output, section);
        }
        let _ = writeln!(output);

        for section in &self.report.sections {
            let Some(peak) = section.peak_difficulty() else {
                continue;
            };
            let _ = writeln!(
                output,
                "- **{}** difficulty path: {} (peak {peak})",
                escape_markdown(&section.name),
                format_trajectory(&section.difficulty_trajectory)
            );
        }
        let _ = writeln!(output);
    }

    fn write_section_row(output: &mut String, section: &SectionBreakdown) {
        let _ = writeln!(
            output,
            "| {} | {}/{} | {} | {} | {} | {} | {} | {} |",
            escape_markdown(&section.name),
            section.answered,
            section.required,
            section.correct,
            format_percent(section.accuracy),
            section.scaled_score,
            section.quick_score,
            section.outcome.description(),
            format_duration(u64::from(section.time_taken_seconds)),
        );
    }

    fn write_difficulty(&self, output: &mut String) {
        let _ = writeln!(output, "## Accuracy by Difficulty\n");

        if self.report.difficulty_stats.is_empty() {
            let _ = writeln!(output, "*No answers recorded.*\n");
            return;
        }

        let _ = writeln!(output, "| Difficulty | Answered | Correct | Accuracy |");
        let _ = writeln!(output, "|------------|----------|---------|----------|");
        for stat in &self.report.difficulty_stats {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                stat.difficulty,
                stat.answered,
                stat.correct,
                format_percent(stat.accuracy())
            );
        }
        let _ = writeln!(output);
    }

    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        if self.report.recommendations.is_empty() {
            let _ = writeln!(output, "*No specific recommendations.*\n");
            return;
        }

        let mut sorted_recs: Vec<_> = self.report.recommendations.iter().collect();
        sorted_recs.sort_by_key(|r| r.priority);

        for (index, rec) in sorted_recs.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **[{}]** {}",
                index + 1,
                escape_markdown(&rec.category),
                escape_markdown(&rec.description),
            );
        }

        let _ = writeln!(output);
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.report.generated_at);
        let _ = writeln!(output, "*Generated by Adaptest at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds, e.g. `"1h 1m 1s"`.
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn format_trajectory(trajectory: &[u8]) -> String {
    trajectory
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Escapes characters that would break Markdown formatting or table cells.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{AnswerInput, ReportInput, SectionInput, SectionOutcome};

    fn sample_report() -> Report {
        let input = ReportInput {
            title: "Mock | Week 3".to_string(),
            expected_sections: 2,
            total_scaled_score: None,
            sections: vec![SectionInput {
                name: "Verbal".to_string(),
                required_count: 23,
                scaled_score: 71,
                quick_score: 70,
                accuracy: 33.3,
                outcome: SectionOutcome::TimeExpired,
                time_taken_seconds: 2700,
                answers: vec![
                    AnswerInput::new("v-1", 3, true),
                    AnswerInput::new("v-2", 4, false),
                    AnswerInput::new("v-3", 3, false),
                ],
                difficulty_trajectory: vec![3, 4, 3, 2],
            }],
        };
        Report::from_input(&input).unwrap()
    }

    #[test]
    fn test_generate_contains_all_sections() {
        let report = sample_report();
        let markdown = MarkdownGenerator::new(&report).generate();

        assert!(markdown.contains("# Adaptest Report: Mock \\| Week 3"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Sections"));
        assert!(markdown.contains("## Accuracy by Difficulty"));
        assert!(markdown.contains("## Recommendations"));
        assert!(markdown.contains("*Generated by Adaptest at"));
    }

    #[test]
    fn test_summary_table() {
        let report = sample_report();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| Status | Exam incomplete |"));
        assert!(markdown.contains("| Total Score | Not scored |"));
        assert!(markdown.contains("| Sections | 1 of 2 |"));
        assert!(markdown.contains("| Time Taken | 45m |"));
    }

    #[test]
    fn test_section_row_and_trajectory() {
        let report = sample_report();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| Verbal | 3/23 | 1 | 33.3% | 71 | 70 | Time expired | 45m |"));
        assert!(markdown.contains("- **Verbal** difficulty path: 3 → 4 → 3 → 2 (peak 4)"));
    }

    #[test]
    fn test_difficulty_table() {
        let report = sample_report();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| 3 | 2 | 1 | 50.0% |"));
        assert!(markdown.contains("| 4 | 1 | 0 | 0.0% |"));
    }

    #[test]
    fn test_recommendations_numbered() {
        let report = sample_report();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("1. **[accuracy]** Verbal: scored 71."));
        assert!(markdown.contains("2. **[pacing]**"));
    }

    #[test]
    fn test_empty_report_placeholders() {
        let input = ReportInput {
            title: "Nothing".to_string(),
            expected_sections: 3,
            ..ReportInput::default()
        };
        let report = Report::from_input(&input).unwrap();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("*No sections completed.*"));
        assert!(markdown.contains("*No answers recorded.*"));
        assert!(markdown.contains("*No specific recommendations.*"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(2700), "45m");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a|b"), "a\\|b");
        assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
        assert_eq!(escape_markdown("line\nbreak"), "line<br>break");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
