//! # dmesh-chunk
//!
//! Splits serialized message envelopes into chunks sized for a
//! transport's MTU and reassembles received chunk sets.
//!
//! Chunks themselves are not signed; integrity rests on the envelope's
//! signature after reassembly, with the message id binding every chunk
//! to one specific ciphertext.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunker;
pub mod collector;
pub mod error;

pub use chunker::{chunk, reassemble};
pub use collector::{ChunkCollector, ChunkProgress, CollectorConfig};
pub use error::{ChunkError, Result};
