//! Wire-level errors and the shared error taxonomy.
//!
//! Every dmesh error, in every crate, carries a stable code and a
//! category. Codes are fixed identifiers exercised by tests; categories
//! drive caller policy (retry, discard, surface to the user).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error classes shared by the whole workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Key generation, sealing, opening, signature primitives.
    Crypto,
    /// A well-formed input that violates a protocol rule.
    Validation,
    /// Malformed bytes: JSON, base64, envelope shape.
    Format,
    /// Replay, unknown sender, and other trust failures.
    Security,
    /// Persistent storage failures.
    Store,
    /// Transport and channel failures.
    Transport,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Crypto => "crypto",
            Self::Validation => "validation",
            Self::Format => "format",
            Self::Security => "security",
            Self::Store => "store",
            Self::Transport => "transport",
        };
        write!(f, "{}", name)
    }
}

/// Errors produced by the wire codec itself.
#[derive(Error, Debug)]
pub enum WireError {
    /// The JSON did not describe a recognized dmesh object.
    #[error("invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// A base64 field failed to decode.
    #[error("base64 decode failed: {0}")]
    Base64DecodeFailed(String),

    /// The text was not valid JSON.
    #[error("JSON parse failed: {0}")]
    JsonParseFailed(String),

    /// A fixed-length byte field had the wrong decoded length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected byte length.
        expected: usize,
        /// Actual decoded length.
        actual: usize,
    },
}

impl WireError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessageFormat(_) => "InvalidMessageFormat",
            Self::Base64DecodeFailed(_) => "Base64DecodeFailed",
            Self::JsonParseFailed(_) => "JsonParseFailed",
            Self::InvalidKeyLength { .. } => "InvalidKeyLength",
        }
    }

    /// Error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMessageFormat(_)
            | Self::Base64DecodeFailed(_)
            | Self::JsonParseFailed(_) => ErrorCategory::Format,
            Self::InvalidKeyLength { .. } => ErrorCategory::Validation,
        }
    }
}

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            WireError::InvalidMessageFormat(String::new()).code(),
            "InvalidMessageFormat"
        );
        assert_eq!(
            WireError::Base64DecodeFailed(String::new()).code(),
            "Base64DecodeFailed"
        );
        assert_eq!(
            WireError::JsonParseFailed(String::new()).code(),
            "JsonParseFailed"
        );
        assert_eq!(
            WireError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
            .code(),
            "InvalidKeyLength"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            WireError::JsonParseFailed(String::new()).category(),
            ErrorCategory::Format
        );
        assert_eq!(
            WireError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
            .category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Crypto.to_string(), "crypto");
        assert_eq!(ErrorCategory::Transport.to_string(), "transport");
    }
}
