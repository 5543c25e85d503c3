//! Aggregate error for the embedding surface.

use thiserror::Error;

use dmesh_wire::ErrorCategory;

/// Errors surfaced to embedders.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No contact is recorded for the requested party.
    #[error("unknown sender or recipient: {0}")]
    UnknownSender(String),

    /// The contact was marked compromised; traffic is refused.
    #[error("contact {0} is marked compromised")]
    ContactCompromised(String),

    /// No identity exists in the store yet.
    #[error("no identity found in store")]
    NoIdentity,

    /// A crypto operation failed.
    #[error(transparent)]
    Crypto(#[from] dmesh_crypto::CryptoError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] dmesh_store::StoreError),

    /// Chunking or reassembly failed.
    #[error(transparent)]
    Chunk(#[from] dmesh_chunk::ChunkError),

    /// A sync session failed.
    #[error(transparent)]
    Sync(#[from] dmesh_sync::SyncError),

    /// A transport failed.
    #[error(transparent)]
    Transport(#[from] dmesh_transport::TransportError),

    /// A format-level failure.
    #[error(transparent)]
    Wire(#[from] dmesh_wire::WireError),
}

impl CoreError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownSender(_) => "UnknownSender",
            Self::ContactCompromised(_) => "ContactCompromised",
            Self::NoIdentity => "StorageError",
            Self::Crypto(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Chunk(e) => e.code(),
            Self::Sync(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Wire(e) => e.code(),
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownSender(_) | Self::ContactCompromised(_) => ErrorCategory::Security,
            Self::NoIdentity => ErrorCategory::Store,
            Self::Crypto(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Chunk(e) => e.category(),
            Self::Sync(e) => e.category(),
            Self::Transport(e) => e.category(),
            Self::Wire(e) => e.category(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
