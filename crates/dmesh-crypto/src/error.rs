//! Error types for cryptographic operations.
//!
//! Each variant corresponds to exactly one failing check in the encrypt
//! or decrypt pipelines; the first failing check is the one surfaced.

use thiserror::Error;

use dmesh_wire::{ErrorCategory, WireError};

/// Errors from key handling, sealing, and the decrypt state machine.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material could not be generated or reconstructed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Box open failed (wrong key, wrong nonce, or corrupt ciphertext),
    /// or box sealing failed (an invariant violation with valid inputs).
    #[error("decryption failed: invalid ciphertext or key")]
    DecryptionFailed,

    /// The detached Ed25519 signature did not verify.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Plaintext content exceeds the protocol maximum.
    #[error("content too large: {actual} bytes (max {max})")]
    ContentTooLarge {
        /// Maximum allowed bytes.
        max: usize,
        /// Actual content size.
        actual: usize,
    },

    /// Strict mode: the envelope timestamp is outside the skew window.
    #[error("timestamp skew too large: ts={ts}, now={now}")]
    TimestampSkew {
        /// Envelope timestamp (ms).
        ts: u64,
        /// Local clock (ms).
        now: u64,
    },

    /// Delay-tolerant mode: the envelope has expired.
    #[error("message expired at {exp} (now {now})")]
    MessageExpired {
        /// Expiration time (ms).
        exp: u64,
        /// Local clock (ms).
        now: u64,
    },

    /// The envelope names a different recipient box key.
    #[error("envelope is not addressed to this recipient")]
    RecipientMismatch,

    /// The sender's keys differ from the caller's pinned expectation.
    #[error("sender key mismatch: pinned keys differ from envelope keys")]
    SenderKeyMismatch,

    /// A fixed-length byte field decoded to the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected byte length.
        expected: usize,
        /// Actual decoded length.
        actual: usize,
    },

    /// The declared msgId does not match the ciphertext hash.
    #[error("message id does not match ciphertext")]
    MessageIdMismatch,

    /// This (msg_id, sender) pair was already accepted once.
    #[error("replay detected")]
    ReplayDetected,

    /// The replay guard's backing store failed.
    #[error("storage error during replay check: {0}")]
    StorageError(String),

    /// A format-level failure (JSON, base64, envelope shape).
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl CryptoError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::KeyGenerationFailed(_) => "KeyGenerationFailed",
            Self::DecryptionFailed => "DecryptionFailed",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::ContentTooLarge { .. } => "ContentTooLarge",
            Self::TimestampSkew { .. } => "TimestampSkew",
            Self::MessageExpired { .. } => "MessageExpired",
            Self::RecipientMismatch => "RecipientMismatch",
            Self::SenderKeyMismatch => "SenderKeyMismatch",
            Self::InvalidKeyLength { .. } => "InvalidKeyLength",
            Self::MessageIdMismatch => "MessageIdMismatch",
            Self::ReplayDetected => "ReplayDetected",
            Self::StorageError(_) => "StorageError",
            Self::Wire(e) => e.code(),
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyGenerationFailed(_) | Self::DecryptionFailed | Self::SignatureInvalid => {
                ErrorCategory::Crypto
            }
            Self::ContentTooLarge { .. }
            | Self::TimestampSkew { .. }
            | Self::MessageExpired { .. }
            | Self::RecipientMismatch
            | Self::SenderKeyMismatch
            | Self::InvalidKeyLength { .. }
            | Self::MessageIdMismatch => ErrorCategory::Validation,
            Self::ReplayDetected => ErrorCategory::Security,
            Self::StorageError(_) => ErrorCategory::Store,
            Self::Wire(e) => e.category(),
        }
    }
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
