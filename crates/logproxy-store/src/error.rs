//! Error types for the session store.
//!
//! "Never written" is reported as [`StoreError::NotFound`] so callers can
//! tell it apart from a broken disk ([`StoreError::Io`]).

use std::path::Path;

/// Errors that can occur in the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested session log was never written.
    #[error("not found: {0}")]
    NotFound(String),

    /// A filesystem operation failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the store was doing, including the path involved.
        context: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persisted document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Build a mapper that wraps an I/O error with `action` and `path`.
    pub(crate) fn io(action: &str, path: &Path) -> impl FnOnce(std::io::Error) -> Self + use<> {
        let context = format!("{action} {}", path.display());
        move |source| Self::Io { context, source }
    }
}
