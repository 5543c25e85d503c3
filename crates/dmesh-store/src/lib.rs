//! # dmesh-store
//!
//! Persistent collections for a dmesh node, backed by sled:
//!
//! - **keys**: the node's own key material (opt-in persistence)
//! - **contacts**: known peers with a verification lifecycle
//! - **outbox** / **inbox**: the send queue and received messages
//! - **seen**: replay-deduplication pairs with atomic check-and-mark
//! - **forwarded**: per-peer forwarding receipts for sync
//! - **chunks**: partially received chunk sets
//!
//! Records are bincode-encoded; envelopes and payloads are kept as
//! their canonical JSON strings so the bytes that arrived are the
//! bytes that get re-sent. Writes are atomic per tree, which is the
//! transaction boundary every invariant here relies on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunks;
pub mod contacts;
pub mod error;
pub mod inbox;
pub mod keys;
pub mod outbox;
pub mod seen;
pub mod store;

pub use chunks::ChunkBuffer;
pub use contacts::{Contact, ContactStore, VerificationStatus};
pub use error::{Result, StoreError};
pub use inbox::{Inbox, InboxEntry};
pub use keys::{KeyStore, OwnKeys};
pub use outbox::{Outbox, OutboxEntry, OutboxStatus};
pub use seen::{ForwardedSet, SeenSet};
pub use store::{Store, StoreStats};
