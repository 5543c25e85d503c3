//! # dmesh-core
//!
//! The embedding surface of dmesh: one [`DmeshClient`] owning the
//! node's identity and store, gluing the crypto, chunking, transport,
//! and sync crates into the flows an application actually calls:
//!
//! - create or load an identity, share it as a `dmesh-id` card
//! - encrypt and queue messages for known contacts
//! - process inbound records of any kind (messages, identities,
//!   chunks), with contact pinning, trust-on-first-use, replay
//!   deduplication, and store-and-forward re-queuing
//! - run sync sessions and fold their results back into the store

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;

pub use client::{DmeshClient, Incoming, SendOptions, SyncOutcome, TrustPolicy};
pub use error::{CoreError, Result};
