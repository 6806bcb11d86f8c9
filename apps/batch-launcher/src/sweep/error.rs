//! Error types for sweep enumeration.

use thiserror::Error;

use super::range::RangeError;

/// Errors raised while expanding a sweep into work items.
///
/// All of these abort the run before any worker is launched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SweepError {
    /// A parameter range is malformed.
    #[error("Invalid range for parameter '{name}': {source}")]
    InvalidRange {
        /// Parameter name.
        name: String,
        /// Underlying range error.
        source: RangeError,
    },

    /// A date could not be parsed or left the calendar range.
    #[error("Invalid date '{value}'")]
    InvalidDate {
        /// The offending input.
        value: String,
    },

    /// Window duration must be at least one month.
    #[error("Invalid window duration {months}: must be at least one month")]
    InvalidDuration {
        /// The rejected duration.
        months: i32,
    },

    /// A symbol has no earliest-data-date entry.
    #[error("No earliest data date for symbol '{symbol}'")]
    UnknownSymbol {
        /// The symbol.
        symbol: String,
    },

    /// Parameter snapshot could not be serialized.
    #[error("Failed to serialize parameters: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}
