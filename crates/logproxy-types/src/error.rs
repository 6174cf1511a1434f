//! Validation errors for the shared data model.

/// Errors raised when raw input cannot be turned into a typed value.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The server instance token is empty, too long, or contains
    /// characters that are not safe in a file name.
    #[error("invalid server token: {0:?}")]
    InvalidToken(String),

    /// The log session id is empty, too long, or contains characters that
    /// are not safe in a file name.
    #[error("invalid log session id: {0:?}")]
    InvalidSessionId(String),

    /// The timestamp does not follow `MM/DD/YYYY - HH:MM:SS.mmm`.
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        /// The raw value that failed to parse.
        value: String,
        /// The underlying chrono parse error.
        source: chrono::ParseError,
    },

    /// The end offset lies before the begin offset.
    #[error("inverted byte range: begin {begin} > end {end}")]
    InvertedRange {
        /// Declared begin offset.
        begin: u64,
        /// Declared end offset.
        end: u64,
    },
}
