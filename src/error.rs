//! Error types for filecab.

use thiserror::Error;

/// Common error type for filecab.
#[derive(Error, Debug)]
pub enum FilecabError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error (no valid session or bad credentials).
    #[error("authentication error: {0}")]
    Auth(String),

    /// The caller may not perform this operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The resource is not in the state the operation requires.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The resource changed underneath the operation or already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The blob store rejected or failed an operation.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Storing uploaded bytes failed after exhausting the retry budget.
    #[error("upload failed after {attempts} attempt(s): {reason}")]
    UploadFailed {
        /// Number of attempts made against the blob store.
        attempts: u32,
        /// Last error reported by the blob store.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FilecabError {
    fn from(e: sqlx::Error) -> Self {
        FilecabError::Database(e.to_string())
    }
}

/// Result type alias for filecab operations.
pub type Result<T> = std::result::Result<T, FilecabError>;
