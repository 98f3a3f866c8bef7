//! Error types for the Adaptest engine.
//!
//! This module defines the error hierarchy for engine operations, including
//! configuration loading, question pool loading, and misuse of the section
//! and mock state machines.
//!
//! Running out of fresh questions and running out of time are not errors:
//! both are ordinary ways for a section to end and are reported through
//! [`crate::CompletionReason`].

use std::path::PathBuf;

use crate::question::Section;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while configuring or driving the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your adaptest.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Question Pool Errors
    // ========================================================================
    /// Question pool file was not found.
    #[error("Question pool not found: '{path}'\n\nSuggestion: Check the --pool argument or export the pool from the question store")]
    PoolNotFound {
        /// Path where the pool was expected.
        path: PathBuf,
    },

    /// Question pool file could not be parsed.
    #[error("Invalid question pool '{path}': {message}\n\nSuggestion: The pool must be a JSON array of questions or an object with a \"questions\" array")]
    PoolParseError {
        /// Path to the pool file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    // ========================================================================
    // Section Session Misuse
    // ========================================================================
    /// A mutator was called on a section that has not been started.
    #[error("The {section} section has not been started")]
    SessionNotStarted {
        /// Section the call was made against.
        section: Section,
    },

    /// `start` was called on a section that is already running or finished.
    #[error("The {section} section has already been started")]
    SessionAlreadyStarted {
        /// Section the call was made against.
        section: Section,
    },

    /// A mutator was called on a section that has already completed.
    #[error("The {section} section is already completed; no change was made")]
    SessionCompleted {
        /// Section the call was made against.
        section: Section,
    },

    /// The live section actor is no longer running.
    #[error("The live {section} section is closed")]
    SessionClosed {
        /// Section the call was made against.
        section: Section,
    },

    /// The live section was torn down before it completed.
    #[error("The live {section} section was torn down after {answered} answers")]
    SessionTornDown {
        /// Section that was torn down.
        section: Section,
        /// Number of answers recorded before teardown.
        answered: usize,
    },

    // ========================================================================
    // Mock Orchestration Misuse
    // ========================================================================
    /// A mutator was called on a mock exam that has not been started.
    #[error("The mock exam has not been started")]
    MockNotStarted,

    /// A mutator was called on a mock exam that has already been finalized.
    #[error("The mock exam is already finalized; no change was made")]
    MockFinalized,

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `PoolNotFound` error.
    #[must_use]
    pub fn pool_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PoolNotFound { path: path.into() }
    }

    /// Creates a new `PoolParseError`.
    #[must_use]
    pub fn pool_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PoolParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the caller used a state machine incorrectly.
    ///
    /// Misuse errors guarantee that no state was mutated by the rejected call.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::SessionNotStarted { .. }
                | Self::SessionAlreadyStarted { .. }
                | Self::SessionCompleted { .. }
                | Self::MockNotStarted
                | Self::MockFinalized
        )
    }

    /// Returns `true` if this error prevents the engine from starting at all.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::PoolNotFound { .. }
                | Self::PoolParseError { .. }
        )
    }
}
