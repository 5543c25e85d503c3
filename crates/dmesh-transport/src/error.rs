//! Error types for transport adapters.

use thiserror::Error;

use dmesh_wire::{ErrorCategory, WireError};

/// Errors from transport adapters and the manager.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The carrier failed (host clipboard, file I/O, channel).
    #[error("transport I/O failed: {0}")]
    Io(String),

    /// The named transport is not registered or not available.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// An inbound payload was not a parseable dmesh record.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Chunking or reassembly failed.
    #[error("chunking failed: {0}")]
    Chunk(#[from] dmesh_chunk::ChunkError),
}

impl TransportError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Unavailable(_) => "TransportError",
            Self::Wire(e) => e.code(),
            Self::Chunk(e) => e.code(),
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) | Self::Unavailable(_) => ErrorCategory::Transport,
            Self::Wire(e) => e.category(),
            Self::Chunk(e) => e.category(),
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
