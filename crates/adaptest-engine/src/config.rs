//! Configuration types for the Adaptest engine.
//!
//! Section order, per-section question counts and time limits, and the live
//! timer interval are fixed per deployment and constant within a run.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::question::Section;

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "adaptest.json";

/// Default section order of a mock exam.
fn default_sections() -> Vec<Section> {
    Section::ALL.to_vec()
}

/// Default section time limit in seconds (45 minutes).
const fn default_time_limit() -> u32 {
    2700
}

/// Default live timer interval in milliseconds.
const fn default_tick_interval_ms() -> u64 {
    1000
}

/// Default output directory for results and reports.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Main configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Sections of a mock exam, in the order they are taken.
    #[serde(default = "default_sections")]
    pub sections: Vec<Section>,

    /// Question counts and time limits per section.
    #[serde(default)]
    pub section_rules: SectionRules,

    /// Real time between two live timer ticks, in milliseconds.
    ///
    /// Every tick removes one second from the section clock.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for the question draw. A fixed seed makes runs reproducible.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Output directory for results and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            section_rules: SectionRules::default(),
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            output_dir: default_output_dir(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            EngineError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `adaptest.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigParseError` if the file exists but contains
    /// invalid JSON or unknown section names, and
    /// `EngineError::ConfigValidationError` if the values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(EngineError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| EngineError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `sections` must be non-empty and must not repeat a section
    /// - every section rule must have a non-zero count and time limit
    /// - `tickIntervalMs` must be greater than 0
    /// - `outputDir` must not be empty
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(EngineError::config_validation(
                "sections must not be empty",
                "List at least one of 'quantitative', 'verbal', 'data_insights' in your adaptest.json",
            ));
        }

        for (i, section) in self.sections.iter().enumerate() {
            if self.sections[..i].contains(section) {
                return Err(EngineError::config_validation(
                    format!("section '{}' is listed more than once", section.key()),
                    "Each section may appear only once in sections",
                ));
            }
        }

        for section in Section::ALL {
            let rule = self.section_rules.get(section);
            if rule.required_count == 0 {
                return Err(EngineError::config_validation(
                    format!(
                        "sectionRules.{}.requiredCount must be greater than 0",
                        section.key()
                    ),
                    "Set requiredCount to at least 1 in your adaptest.json",
                ));
            }
            if rule.time_limit_seconds == 0 {
                return Err(EngineError::config_validation(
                    format!(
                        "sectionRules.{}.timeLimitSeconds must be greater than 0",
                        section.key()
                    ),
                    "Set timeLimitSeconds to at least 1 second in your adaptest.json",
                ));
            }
        }

        if self.tick_interval_ms == 0 {
            return Err(EngineError::config_validation(
                "tickIntervalMs must be greater than 0",
                "Set tickIntervalMs to 1000 for a real-time clock in your adaptest.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(EngineError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your adaptest.json (use '.' for current directory)",
            ));
        }

        Ok(())
    }

    /// Live timer interval as a [`Duration`].
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Question count and time limit of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRule {
    /// Answers needed to complete the section.
    pub required_count: usize,
    /// Section clock in seconds.
    pub time_limit_seconds: u32,
}

impl SectionRule {
    /// Creates a rule.
    #[must_use]
    pub const fn new(required_count: usize, time_limit_seconds: u32) -> Self {
        Self {
            required_count,
            time_limit_seconds,
        }
    }

    /// Default rule for `section`: 21, 23 or 20 questions in 45 minutes.
    #[must_use]
    pub const fn standard(section: Section) -> Self {
        let required_count = match section {
            Section::Quantitative => 21,
            Section::Verbal => 23,
            Section::DataInsights => 20,
        };
        Self::new(required_count, default_time_limit())
    }
}

/// Rules for every section.
///
/// Each field of a section rule may be omitted on disk; missing values fall
/// back to that section's [`SectionRule::standard`] rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSectionRules")]
pub struct SectionRules {
    /// Quantitative Reasoning rule.
    pub quantitative: SectionRule,
    /// Verbal Reasoning rule.
    pub verbal: SectionRule,
    /// Data Insights rule.
    pub data_insights: SectionRule,
}

impl Default for SectionRules {
    fn default() -> Self {
        Self {
            quantitative: SectionRule::standard(Section::Quantitative),
            verbal: SectionRule::standard(Section::Verbal),
            data_insights: SectionRule::standard(Section::DataInsights),
        }
    }
}

/// On-disk form of a [`SectionRule`] with every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSectionRule {
    required_count: Option<usize>,
    time_limit_seconds: Option<u32>,
}

impl RawSectionRule {
    fn resolve(self, section: Section) -> SectionRule {
        let standard = SectionRule::standard(section);
        SectionRule::new(
            self.required_count.unwrap_or(standard.required_count),
            self.time_limit_seconds.unwrap_or(standard.time_limit_seconds),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSectionRules {
    #[serde(default)]
    quantitative: RawSectionRule,
    #[serde(default)]
    verbal: RawSectionRule,
    #[serde(default)]
    data_insights: RawSectionRule,
}

impl From<RawSectionRules> for SectionRules {
    fn from(raw: RawSectionRules) -> Self {
        Self {
            quantitative: raw.quantitative.resolve(Section::Quantitative),
            verbal: raw.verbal.resolve(Section::Verbal),
            data_insights: raw.data_insights.resolve(Section::DataInsights),
        }
    }
}

impl SectionRules {
    /// Returns the rule for `section`.
    #[must_use]
    pub const fn get(&self, section: Section) -> SectionRule {
        match section {
            Section::Quantitative => self.quantitative,
            Section::Verbal => self.verbal,
            Section::DataInsights => self.data_insights,
        }
    }
}
