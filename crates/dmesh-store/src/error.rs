//! Error types for the persistent store.

use thiserror::Error;

use dmesh_wire::ErrorCategory;

/// Errors from the sled-backed collections.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(String),

    /// A record failed to encode or decode.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A contact's pinned keys would change silently.
    #[error("contact key change rejected for {0}")]
    KeyChangeRejected(String),
}

impl StoreError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Serialization(_) | Self::NotFound(_) => "StorageError",
            Self::KeyChangeRejected(_) => "SenderKeyMismatch",
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyChangeRejected(_) => ErrorCategory::Validation,
            _ => ErrorCategory::Store,
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
