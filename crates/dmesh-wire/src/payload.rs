//! The plaintext payload carried inside the sealed ciphertext.
//!
//! `{ "v":1, "ts", "type", "content", ...extras }` — extras are kept as
//! an open map so unknown payload kinds round-trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, WireError};
use crate::limits::WIRE_VERSION;

/// Default payload type for plain text messages.
pub const TYPE_TEXT: &str = "text";
/// Status broadcast: the sender is safe.
pub const TYPE_IM_SAFE: &str = "im_safe";
/// A request for help, with an `urgency` extra.
pub const TYPE_NEED_HELP: &str = "need_help";
/// Shelter location and capacity information.
pub const TYPE_SHELTER_INFO: &str = "shelter_info";
/// A medical emergency report.
pub const TYPE_MEDICAL: &str = "medical";
/// Available or needed supplies.
pub const TYPE_SUPPLIES: &str = "supplies";
/// An application-level acknowledgement referencing another message.
pub const TYPE_ACK: &str = "ack";

/// The decrypted message payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Payload version, always 1.
    pub v: u32,
    /// Creation time, Unix milliseconds (matches the envelope `ts`).
    pub ts: u64,
    /// Payload type tag; `text` when absent at construction.
    #[serde(rename = "type")]
    pub payload_type: String,
    /// The human-readable message body.
    pub content: String,
    /// Type-specific extras (urgency, location, people, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    /// Build a payload, defaulting the type to `text`.
    pub fn new(
        ts: u64,
        payload_type: Option<&str>,
        content: &str,
        extra: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            v: WIRE_VERSION,
            ts,
            payload_type: payload_type.unwrap_or(TYPE_TEXT).to_string(),
            content: content.to_string(),
            extra: extra.unwrap_or_default(),
        }
    }

    /// Serialize to the exact bytes that get sealed.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("payload serialization cannot fail")
    }

    /// Parse a decrypted plaintext back into a payload.
    ///
    /// # Errors
    ///
    /// `JsonParseFailed` when the plaintext is not the expected JSON.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| WireError::JsonParseFailed(e.to_string()))
    }

    /// The `urgency` extra, when present (used by `need_help` and
    /// `medical` payloads).
    pub fn urgency(&self) -> Option<&str> {
        self.extra.get("urgency").and_then(Value::as_str)
    }
}
