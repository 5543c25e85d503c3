//! Sync protocol frames.
//!
//! Five frame kinds drive a session: HELLO, INV, GET, DATA, ACK. Every
//! frame carries `v`, its `kind` tag, a millisecond timestamp, and an
//! Ed25519 signature computed over the frame's canonical JSON with the
//! signature field blank. Signing and verification live in `dmesh-sync`;
//! this module defines shapes and the canonical signing text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{Chunk, MessageEnvelope};
use crate::error::{Result, WireError};

/// Frame tag for session handshakes.
pub const KIND_HELLO: &str = "sync-hello";
/// Frame tag for inventory offers.
pub const KIND_INV: &str = "sync-inv";
/// Frame tag for want lists.
pub const KIND_GET: &str = "sync-get";
/// Frame tag for message data.
pub const KIND_DATA: &str = "sync-data";
/// Frame tag for acknowledgements.
pub const KIND_ACK: &str = "sync-ack";

/// Capabilities a peer advertises in its HELLO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCapabilities {
    /// Largest single message (bytes) the peer accepts unchunked.
    pub max_msg_size: usize,
    /// Most inventory items the peer will read.
    pub max_inv_count: usize,
    /// Most data items (envelopes plus chunks) per DATA frame.
    pub max_chunks: usize,
    /// Record kinds the peer understands.
    pub supported_kinds: Vec<String>,
    /// Sync protocol version.
    pub protocol_version: u32,
}

/// Session opener: who the peer is and what it can take.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncHello {
    /// Wire version, always 1.
    pub v: u32,
    /// Frame tag, always `sync-hello`.
    pub kind: String,
    /// Frame creation time, Unix milliseconds.
    pub ts: u64,
    /// base64 of the peer's 16-byte fingerprint.
    pub peer_fp: String,
    /// base64 of the peer's Ed25519 public key.
    pub peer_sign_pk: String,
    /// Advertised limits.
    pub capabilities: SyncCapabilities,
    /// base64 Ed25519 signature over the frame with this field blank.
    pub signature: String,
}

/// One offered message in an inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInvItem {
    /// base64 of the message id.
    pub msg_id: String,
    /// Expiration time, Unix milliseconds.
    pub exp: u64,
    /// Serialized envelope size in bytes.
    pub size: usize,
    /// Scheduling priority, 0 (bulk) through 5 (medical).
    pub priority: u8,
}

/// Inventory offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInv {
    /// Wire version, always 1.
    pub v: u32,
    /// Frame tag, always `sync-inv`.
    pub kind: String,
    /// Frame creation time, Unix milliseconds.
    pub ts: u64,
    /// Offered messages, already filtered and prioritized.
    pub items: Vec<SyncInvItem>,
    /// base64 Ed25519 signature over the frame with this field blank.
    pub signature: String,
}

/// Want list sent in response to an inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncGet {
    /// Wire version, always 1.
    pub v: u32,
    /// Frame tag, always `sync-get`.
    pub kind: String,
    /// Frame creation time, Unix milliseconds.
    pub ts: u64,
    /// base64 message ids the sender wants, in priority order.
    pub want: Vec<String>,
    /// Byte budget the sender is willing to receive.
    pub max_bytes: usize,
    /// base64 Ed25519 signature over the frame with this field blank.
    pub signature: String,
}

/// One item in a DATA frame: a whole envelope or a chunk of one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncDataItem {
    /// A complete message envelope.
    Message(MessageEnvelope),
    /// One chunk of a message too large for the peer's limit.
    Chunk(Chunk),
}

/// Message data answering a GET.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncData {
    /// Wire version, always 1.
    pub v: u32,
    /// Frame tag, always `sync-data`.
    pub kind: String,
    /// Frame creation time, Unix milliseconds.
    pub ts: u64,
    /// Envelopes and chunks, bounded by the peer's `max_chunks`.
    pub messages: Vec<SyncDataItem>,
    /// base64 Ed25519 signature over the frame with this field blank.
    pub signature: String,
}

/// Receipt acknowledgement closing a data leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAck {
    /// Wire version, always 1.
    pub v: u32,
    /// Frame tag, always `sync-ack`.
    pub kind: String,
    /// Frame creation time, Unix milliseconds.
    pub ts: u64,
    /// base64 message ids confirmed received.
    pub received: Vec<String>,
    /// base64 Ed25519 signature over the frame with this field blank.
    pub signature: String,
}

/// Any sync frame, dispatched by its `kind` tag.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncFrame {
    /// Session opener.
    Hello(SyncHello),
    /// Inventory offer.
    Inv(SyncInv),
    /// Want list.
    Get(SyncGet),
    /// Message data.
    Data(SyncData),
    /// Acknowledgement.
    Ack(SyncAck),
}

impl SyncFrame {
    /// Parse a frame from JSON text.
    ///
    /// # Errors
    ///
    /// `JsonParseFailed` on malformed JSON, `InvalidMessageFormat` on a
    /// missing, unknown, or non-sync `kind`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| WireError::JsonParseFailed(e.to_string()))?;
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| WireError::InvalidMessageFormat("missing kind tag".into()))?;

        fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
            serde_json::from_value(value).map_err(|e| WireError::JsonParseFailed(e.to_string()))
        }

        match kind {
            KIND_HELLO => Ok(Self::Hello(from_value(value)?)),
            KIND_INV => Ok(Self::Inv(from_value(value)?)),
            KIND_GET => Ok(Self::Get(from_value(value)?)),
            KIND_DATA => Ok(Self::Data(from_value(value)?)),
            KIND_ACK => Ok(Self::Ack(from_value(value)?)),
            other => Err(WireError::InvalidMessageFormat(format!(
                "not a sync frame: {}",
                other
            ))),
        }
    }

    /// The frame's `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello(_) => KIND_HELLO,
            Self::Inv(_) => KIND_INV,
            Self::Get(_) => KIND_GET,
            Self::Data(_) => KIND_DATA,
            Self::Ack(_) => KIND_ACK,
        }
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> String {
        match self {
            Self::Hello(f) => serde_json::to_string(f),
            Self::Inv(f) => serde_json::to_string(f),
            Self::Get(f) => serde_json::to_string(f),
            Self::Data(f) => serde_json::to_string(f),
            Self::Ack(f) => serde_json::to_string(f),
        }
        .expect("frame serialization cannot fail")
    }
}

/// Canonical text a frame signature covers.
///
/// The frame is serialized to a JSON value, the `signature` field is set
/// to the empty string, and the value is re-serialized. serde_json keeps
/// object keys sorted, so signer and verifier produce identical text no
/// matter how the transport ordered the fields.
///
/// # Errors
///
/// `InvalidMessageFormat` when the frame does not serialize to an object.
pub fn frame_signing_text<T: Serialize>(frame: &T) -> Result<String> {
    let mut value =
        serde_json::to_value(frame).map_err(|e| WireError::JsonParseFailed(e.to_string()))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| WireError::InvalidMessageFormat("frame is not a JSON object".into()))?;
    obj.insert("signature".into(), Value::String(String::new()));
    Ok(serde_json::to_string(&value).expect("canonical frame serialization cannot fail"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello() -> SyncHello {
        SyncHello {
            v: 1,
            kind: KIND_HELLO.into(),
            ts: 1_706_012_345_678,
            peer_fp: "ZnA=".into(),
            peer_sign_pk: "cGs=".into(),
            capabilities: SyncCapabilities {
                max_msg_size: 2048,
                max_inv_count: 100,
                max_chunks: 64,
                supported_kinds: vec!["dmesh-msg".into(), "dmesh-chunk".into()],
                protocol_version: 1,
            },
            signature: "c2ln".into(),
        }
    }

    #[test]
    fn test_hello_round_trip() {
        let hello = sample_hello();
        let parsed = SyncFrame::parse(&SyncFrame::Hello(hello.clone()).to_json()).unwrap();
        assert_eq!(parsed, SyncFrame::Hello(hello));
    }

    #[test]
    fn test_frame_kinds() {
        assert_eq!(SyncFrame::Hello(sample_hello()).kind(), "sync-hello");
    }

    #[test]
    fn test_parse_rejects_message_record() {
        let text = r#"{"v":1,"kind":"dmesh-msg"}"#;
        let err = SyncFrame::parse(text).unwrap_err();
        assert_eq!(err.code(), "InvalidMessageFormat");
    }

    #[test]
    fn test_signing_text_blanks_signature() {
        let hello = sample_hello();
        let text = frame_signing_text(&hello).unwrap();
        assert!(text.contains(r#""signature":"""#));
        assert!(!text.contains("c2ln"));
    }

    #[test]
    fn test_signing_text_is_order_independent() {
        // The same frame parsed from differently-ordered JSON must sign
        // identically.
        let hello = sample_hello();
        let canonical = frame_signing_text(&hello).unwrap();

        let json = SyncFrame::Hello(hello).to_json();
        let reparsed: SyncHello = serde_json::from_str(&json).unwrap();
        assert_eq!(frame_signing_text(&reparsed).unwrap(), canonical);
    }

    #[test]
    fn test_data_item_untagged_dispatch() {
        let data = SyncData {
            v: 1,
            kind: KIND_DATA.into(),
            ts: 5,
            messages: vec![SyncDataItem::Chunk(Chunk {
                v: 1,
                kind: "dmesh-chunk".into(),
                msg_id: "bWlk".into(),
                seq: 0,
                total: 1,
                data: "ZA==".into(),
            })],
            signature: String::new(),
        };
        let json = serde_json::to_string(&data).unwrap();
        let back: SyncData = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.messages[0], SyncDataItem::Chunk(_)));
    }

    #[test]
    fn test_inv_item_fields() {
        let inv = SyncInv {
            v: 1,
            kind: KIND_INV.into(),
            ts: 9,
            items: vec![SyncInvItem {
                msg_id: "aWQ=".into(),
                exp: 100,
                size: 512,
                priority: 5,
            }],
            signature: String::new(),
        };
        let json = serde_json::to_string(&inv).unwrap();
        assert!(json.contains("\"msg_id\""));
        assert!(json.contains("\"priority\":5"));
    }
}
