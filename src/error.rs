//! Error types for the title-dupes crate.

use std::path::PathBuf;

/// Engine-level error types.
#[derive(Debug, thiserror::Error)]
pub enum DupeError {
    /// Settings file is well-formed JSON but carries an unusable value.
    #[error("invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Dictionary entry rejected during validation.
    #[error("malformed dictionary: {0}")]
    Dictionary(String),

    /// A synonym rewrite rule could not be compiled.
    #[error("invalid rewrite pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Duplicate search was cancelled before all candidates were scored.
    #[error("duplicate search cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error with context.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for title-dupes operations.
pub type DupeResult<T> = Result<T, DupeError>;
