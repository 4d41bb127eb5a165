//! Error types for relnote.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using relnote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers branch on this to decide how to report a failure: a storage
/// failure may have left partial writes behind and is recovered by
/// repeating the whole operation, a validation failure never reached the
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A read or write against the store failed.
    Storage,
    /// Input was rejected before any store call.
    Validation,
    /// Configuration or serialization problems outside the engine.
    Other,
}

/// Core error type for relnote operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-SQL store or blob backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Release not found
    #[error("Release not found: {0}")]
    ReleaseNotFound(Uuid),

    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(Uuid),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(_)
            | Error::Storage(_)
            | Error::NotFound(_)
            | Error::ReleaseNotFound(_)
            | Error::TagNotFound(_)
            | Error::Io(_) => ErrorKind::Storage,
            Error::InvalidInput(_) => ErrorKind::Validation,
            Error::Serialization(_) | Error::Config(_) => ErrorKind::Other,
        }
    }

    /// True when the failure came from the store.
    pub fn is_storage(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    /// True when the input was rejected before touching the store.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
