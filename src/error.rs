//! Error types for the Tariff Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while loading tariffs and
//! computing parking fees.

use thiserror::Error;

use crate::models::RuleKind;

/// The main error type for the Tariff Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use tariff_engine::error::EngineError;
///
/// let error = EngineError::InvalidInput {
///     field: "duration_minutes".to_string(),
///     message: "must be positive".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid input 'duration_minutes': must be positive");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule or session failed validation before computation began.
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// The offending field (e.g. `rules[2].time_range`).
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// Two rules of the same kind with equally specific scopes both apply
    /// at the same instant.
    #[error(
        "Ambiguous {kind} rules at minute {offset_minutes}: rules[{first_rule}] and rules[{second_rule}] are equally specific"
    )]
    AmbiguousScope {
        /// The kind shared by the conflicting rules.
        kind: RuleKind,
        /// Minutes from session start where the conflict was detected.
        offset_minutes: i64,
        /// Index of the first conflicting rule.
        first_rule: usize,
        /// Index of the second conflicting rule.
        second_rule: usize,
    },

    /// No tariff is configured for the requested parking lot.
    #[error("Tariff not found: {lot_id}")]
    TariffNotFound {
        /// The lot id that was not found.
        lot_id: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for building an [`EngineError::InvalidInput`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
