//! Error types for chunking and reassembly.

use thiserror::Error;

use dmesh_wire::{ErrorCategory, WireError};

/// Errors from splitting and reassembling envelopes.
#[derive(Error, Debug)]
pub enum ChunkError {
    /// The transport MTU leaves no room for chunk data.
    #[error("chunk size {max_chunk_size} too small for {overhead} bytes of overhead")]
    ChunkSizeTooSmall {
        /// The requested chunk ceiling.
        max_chunk_size: usize,
        /// The fixed per-chunk overhead.
        overhead: usize,
    },

    /// Fewer chunks than the set declares.
    #[error("incomplete chunk set: {received} of {expected}")]
    IncompleteChunks {
        /// Chunks present.
        received: usize,
        /// Chunks declared by `total`.
        expected: usize,
    },

    /// A sequence number is missing or duplicated.
    #[error("missing sequence {expected} (found {found})")]
    MissingSequence {
        /// The sequence number expected at this position.
        expected: u32,
        /// The sequence number actually present.
        found: u32,
    },

    /// Chunks belong to different messages, or the reassembled
    /// ciphertext does not hash to the declared id.
    #[error("chunk message id mismatch")]
    MessageIdMismatch,

    /// A chunk declares an out-of-range sequence or inconsistent total.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// Collector is tracking too many partial messages.
    #[error("too many pending chunk sets ({max})")]
    TooManyPending {
        /// The configured ceiling.
        max: usize,
    },

    /// A format-level failure (JSON, base64, UTF-8).
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl ChunkError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ChunkSizeTooSmall { .. } => "ChunkSizeTooSmall",
            Self::IncompleteChunks { .. } => "IncompleteChunks",
            Self::MissingSequence { .. } => "MissingSequence",
            Self::MessageIdMismatch => "MessageIdMismatch",
            Self::InvalidChunk(_) => "InvalidMessageFormat",
            Self::TooManyPending { .. } => "TooManyPending",
            Self::Wire(e) => e.code(),
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Wire(e) => e.category(),
            Self::InvalidChunk(_) => ErrorCategory::Format,
            _ => ErrorCategory::Validation,
        }
    }
}

/// Result type for chunk operations.
pub type Result<T> = std::result::Result<T, ChunkError>;
