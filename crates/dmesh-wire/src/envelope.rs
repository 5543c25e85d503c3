//! The JSON shapes that travel between peers.
//!
//! Three standalone records (`dmesh-msg`, `dmesh-chunk`, `dmesh-id`)
//! plus [`WireRecord`], the kind-dispatched union used when parsing
//! text of unknown provenance (clipboard paste, scanned QR frame,
//! file drop, sync data item).
//!
//! Byte fields are base64 strings on the wire and stay encoded in
//! these structs; decoding and length enforcement happen in the
//! layers that consume them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};
use crate::frames::{SyncAck, SyncData, SyncGet, SyncHello, SyncInv};
use crate::limits::WIRE_VERSION;

/// Record tag for encrypted messages.
pub const KIND_MESSAGE: &str = "dmesh-msg";

/// Record tag for message chunks.
pub const KIND_CHUNK: &str = "dmesh-chunk";

/// Record tag for public identities.
pub const KIND_IDENTITY: &str = "dmesh-id";

/// The encrypted unit on the wire.
///
/// `msg_id` and `exp` are optional on decode for v1.0 compatibility;
/// current senders always emit both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Wire version, always 1.
    pub v: u32,
    /// Record tag, always `dmesh-msg`.
    pub kind: String,
    /// base64 of the 32-byte message id (SHA-512 prefix of the ciphertext).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    /// Creation time, Unix milliseconds.
    pub ts: u64,
    /// Expiration time, Unix milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// base64 of the sender's Ed25519 public key.
    #[serde(rename = "senderSignPK")]
    pub sender_sign_pk: String,
    /// base64 of the sender's X25519 public key.
    #[serde(rename = "senderBoxPK")]
    pub sender_box_pk: String,
    /// base64 of the recipient's X25519 public key.
    #[serde(rename = "recipientBoxPK")]
    pub recipient_box_pk: String,
    /// base64 of the per-message ephemeral X25519 public key.
    #[serde(rename = "ephPK")]
    pub eph_pk: String,
    /// base64 of the 24-byte box nonce.
    pub nonce: String,
    /// base64 of the sealed payload.
    pub ciphertext: String,
    /// base64 of the 64-byte detached Ed25519 signature.
    pub signature: String,
}

impl MessageEnvelope {
    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("envelope serialization cannot fail")
    }

    /// Parse from JSON text.
    ///
    /// # Errors
    ///
    /// `JsonParseFailed` on malformed JSON or missing required fields.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WireError::JsonParseFailed(e.to_string()))
    }

    /// Check the version and kind tags.
    ///
    /// # Errors
    ///
    /// `InvalidMessageFormat` when either tag is wrong.
    pub fn check_header(&self) -> Result<()> {
        if self.v != WIRE_VERSION || self.kind != KIND_MESSAGE {
            return Err(WireError::InvalidMessageFormat(format!(
                "expected v={} kind={}, got v={} kind={}",
                WIRE_VERSION, KIND_MESSAGE, self.v, self.kind
            )));
        }
        Ok(())
    }
}

/// One slice of a chunked envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Wire version, always 1.
    pub v: u32,
    /// Record tag, always `dmesh-chunk`.
    pub kind: String,
    /// base64 of the message id every sibling chunk shares.
    pub msg_id: String,
    /// Zero-based sequence number.
    pub seq: u32,
    /// Total number of chunks in the set.
    pub total: u32,
    /// base64 of this slice of the serialized envelope.
    pub data: String,
}

impl Chunk {
    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("chunk serialization cannot fail")
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WireError::JsonParseFailed(e.to_string()))
    }

    /// Check the version and kind tags.
    pub fn check_header(&self) -> Result<()> {
        if self.v != WIRE_VERSION || self.kind != KIND_CHUNK {
            return Err(WireError::InvalidMessageFormat(format!(
                "expected v={} kind={}, got v={} kind={}",
                WIRE_VERSION, KIND_CHUNK, self.v, self.kind
            )));
        }
        Ok(())
    }
}

/// A shareable public identity card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    /// Wire version, always 1.
    pub v: u32,
    /// Record tag, always `dmesh-id`.
    pub kind: String,
    /// Display name chosen by the owner.
    pub name: String,
    /// base64 of the 16-byte fingerprint.
    pub fp: String,
    /// base64 of the Ed25519 public key.
    #[serde(rename = "signPK")]
    pub sign_pk: String,
    /// base64 of the X25519 public key.
    #[serde(rename = "boxPK")]
    pub box_pk: String,
}

impl PublicIdentity {
    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("identity serialization cannot fail")
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WireError::JsonParseFailed(e.to_string()))
    }
}

/// Any record dmesh knows how to parse from loose text.
#[derive(Clone, Debug, PartialEq)]
pub enum WireRecord {
    /// An encrypted message envelope.
    Message(MessageEnvelope),
    /// A chunk of a larger envelope.
    Chunk(Chunk),
    /// A public identity card.
    Identity(PublicIdentity),
    /// A sync handshake frame.
    Hello(SyncHello),
    /// A sync inventory frame.
    Inv(SyncInv),
    /// A sync want-list frame.
    Get(SyncGet),
    /// A sync data frame.
    Data(SyncData),
    /// A sync acknowledgement frame.
    Ack(SyncAck),
}

impl WireRecord {
    /// Parse arbitrary text into a known record by its `kind` tag.
    ///
    /// # Errors
    ///
    /// `JsonParseFailed` on malformed JSON, `InvalidMessageFormat` on a
    /// missing or unknown `kind`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| WireError::JsonParseFailed(e.to_string()))?;
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| WireError::InvalidMessageFormat("missing kind tag".into()))?;

        fn from_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
            serde_json::from_value(value).map_err(|e| WireError::JsonParseFailed(e.to_string()))
        }

        match kind {
            KIND_MESSAGE => Ok(Self::Message(from_value(value)?)),
            KIND_CHUNK => Ok(Self::Chunk(from_value(value)?)),
            KIND_IDENTITY => Ok(Self::Identity(from_value(value)?)),
            crate::frames::KIND_HELLO => Ok(Self::Hello(from_value(value)?)),
            crate::frames::KIND_INV => Ok(Self::Inv(from_value(value)?)),
            crate::frames::KIND_GET => Ok(Self::Get(from_value(value)?)),
            crate::frames::KIND_DATA => Ok(Self::Data(from_value(value)?)),
            crate::frames::KIND_ACK => Ok(Self::Ack(from_value(value)?)),
            other => Err(WireError::InvalidMessageFormat(format!(
                "unknown kind: {}",
                other
            ))),
        }
    }
}
