//! Error types for satchel.

use thiserror::Error;

/// Result type alias using satchel's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for satchel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Required note fields missing or malformed; rejected before any store I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A blob put failed; aborts that file's reconciliation step only
    #[error("Blob write failed at {path}: {reason}")]
    BlobWrite { path: String, reason: String },

    /// A blob delete failed; logged and swallowed by callers, never blocks
    /// the record mutation
    #[error("Blob delete failed at {path}: {reason}")]
    BlobDelete { path: String, reason: String },

    /// Record store operation failed (wraps sqlx::Error)
    #[error("Record store error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record store operation failed (non-database backends)
    #[error("Record store error: {0}")]
    RecordStore(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Selection usage error (update with selection != 1, delete with none)
    #[error("Selection error: {0}")]
    Selection(String),

    /// No signed-in identity, or the identity could not be resolved
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True when the failure is local to a single attachment and must not
    /// abort the surrounding batch.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Error::BlobWrite { .. } | Error::BlobDelete { .. } | Error::InvalidInput(_)
        )
    }
}
