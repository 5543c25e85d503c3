//! # dmesh-wire
//!
//! Wire-level primitives for the dmesh protocol:
//!
//! - **Byte utilities**: exact big-endian encoders and concatenation
//! - **Encoding**: standard base64 (padded) and hex for display
//! - **Envelopes**: the JSON shapes for messages, chunks, identities,
//!   and sync frames
//! - **Constants**: protocol limits shared by every crate
//!
//! All wire encodings are canonical JSON with base64 for byte fields.
//! This crate performs no cryptography; it only defines shapes and
//! (de)serialization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bytes;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod frames;
pub mod limits;
pub mod payload;
pub mod time;

pub use bytes::{concat, u32be, u64be};
pub use encoding::{from_base64, to_base64, to_hex};
pub use envelope::{Chunk, MessageEnvelope, PublicIdentity, WireRecord};
pub use error::{ErrorCategory, Result, WireError};
pub use frames::{
    SyncAck, SyncCapabilities, SyncData, SyncDataItem, SyncFrame, SyncGet, SyncHello, SyncInv,
    SyncInvItem,
};
pub use payload::Payload;
