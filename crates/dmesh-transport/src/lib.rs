//! # dmesh-transport
//!
//! Transport adapters for moving dmesh records between nodes over
//! whatever carrier is at hand:
//!
//! - **clipboard**: one canonical JSON string, bidirectional
//! - **qr**: chunked frames for an external renderer/scanner pair
//! - **file**: named `.dmesh` blobs
//!
//! All adapters speak [`WireRecord`](dmesh_wire::WireRecord); none of
//! them touch key material. The [`TransportManager`] holds a registry
//! and dispatches callbacks tagged with the originating transport.
//!
//! The [`FrameChannel`] trait is the bidirectional line channel the
//! sync engine drives; [`PairedChannel`] is its in-memory test double.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod clipboard;
pub mod error;
pub mod file;
pub mod manager;
pub mod qr;
pub mod transport;

pub use channel::{FrameChannel, PairedChannel};
pub use clipboard::{ClipboardHost, ClipboardTransport, InMemoryClipboard};
pub use error::{Result, TransportError};
pub use file::FileTransport;
pub use manager::{TransportManager, TransportManagerConfig};
pub use qr::QrTransport;
pub use transport::{Transport, TransportCapabilities};
