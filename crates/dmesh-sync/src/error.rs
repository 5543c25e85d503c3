//! Error types for the sync engine.

use thiserror::Error;

use dmesh_wire::{ErrorCategory, WireError};

/// Errors from sync sessions.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A frame's Ed25519 signature did not verify.
    #[error("frame signature invalid")]
    SignatureInvalid,

    /// A frame violated the protocol (bad tags, bad fingerprint,
    /// inconsistent fields).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A frame arrived out of phase order.
    #[error("unexpected {got} frame in phase {phase}")]
    UnexpectedFrame {
        /// Kind tag of the offending frame.
        got: &'static str,
        /// The session phase it arrived in.
        phase: &'static str,
    },

    /// A peer exceeded an advertised or local limit.
    #[error("{what} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        /// Which limit.
        what: &'static str,
        /// The enforced ceiling.
        limit: usize,
        /// What the peer sent.
        actual: usize,
    },

    /// Too many sessions from this peer in the window.
    #[error("rate limited: peer {peer}")]
    RateLimited {
        /// Hex fingerprint of the throttled peer.
        peer: String,
    },

    /// The caller cancelled the session.
    #[error("session cancelled")]
    Cancelled,

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] dmesh_store::StoreError),

    /// A crypto operation failed.
    #[error(transparent)]
    Crypto(#[from] dmesh_crypto::CryptoError),

    /// Chunking or reassembly failed.
    #[error(transparent)]
    Chunk(#[from] dmesh_chunk::ChunkError),

    /// The frame channel failed.
    #[error(transparent)]
    Transport(#[from] dmesh_transport::TransportError),

    /// A format-level failure.
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl SyncError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "SignatureInvalid",
            Self::InvalidFrame(_) | Self::UnexpectedFrame { .. } => "InvalidMessageFormat",
            Self::LimitExceeded { .. } => "ContentTooLarge",
            Self::RateLimited { .. } => "RateLimited",
            Self::Cancelled => "TransportError",
            Self::Store(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Chunk(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Wire(e) => e.code(),
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SignatureInvalid => ErrorCategory::Crypto,
            Self::InvalidFrame(_) | Self::UnexpectedFrame { .. } => ErrorCategory::Format,
            Self::LimitExceeded { .. } => ErrorCategory::Validation,
            Self::RateLimited { .. } => ErrorCategory::Security,
            Self::Cancelled => ErrorCategory::Transport,
            Self::Store(e) => e.category(),
            Self::Crypto(e) => e.category(),
            Self::Chunk(e) => e.category(),
            Self::Transport(e) => e.category(),
            Self::Wire(e) => e.category(),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
