//! Core error taxonomy
//!
//! Every public operation returns [`CoreError`]. The lifecycle engine is
//! responsible for picking the right variant; nothing below this layer
//! leaks a raw `rusqlite` or `std::io` error to a caller.

/// Stable error codes surfaced across the tool boundary (§7 of the design).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input violated a schema, range, or uniqueness rule. Recoverable by the caller.
    #[error("{0}")]
    Validation(String),

    /// The referenced card (or other entity) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure from the persistence layer.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Export path was invalid, or writing the NDJSON file failed.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// Filesystem error outside of the export path (data directory creation, etc).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// The stable code used by the tool transport's `{code, message}` envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Storage(_) => "STORAGE_FAILURE",
            CoreError::ExportFailed(_) => "EXPORT_FAILED",
            CoreError::Io(_) => "STORAGE_FAILURE",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn export_failed(message: impl Into<String>) -> Self {
        CoreError::ExportFailed(message.into())
    }
}

/// Core result type.
pub type Result<T> = std::result::Result<T, CoreError>;
