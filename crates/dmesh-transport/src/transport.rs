//! The transport capability surface.

use dmesh_wire::{MessageEnvelope, WireRecord};

use crate::error::Result;

/// What a transport can and cannot do.
///
/// Capability flags drive selection and chunking decisions; they never
/// affect security, which rests entirely on the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Largest single unit the carrier can move, in bytes.
    pub max_payload_size: usize,
    /// Whether oversized envelopes are split into chunks.
    pub supports_chunking: bool,
    /// Whether the carrier moves data both ways in one session.
    pub bidirectional: bool,
    /// Whether delivery is immediate (vs. human-mediated).
    pub realtime: bool,
    /// Whether the carrier works with no infrastructure at all.
    pub offline: bool,
    /// Whether the carrier can discover peers on its own.
    pub peer_discovery: bool,
}

/// A carrier for dmesh records.
///
/// `send` returns the serialized units handed to the carrier (more
/// than one when the envelope was chunked); `receive` returns whatever
/// complete records have arrived since the last poll.
pub trait Transport {
    /// Short stable name (`clipboard`, `qr`, `file`).
    fn name(&self) -> &'static str;

    /// The carrier's capabilities.
    fn capabilities(&self) -> TransportCapabilities;

    /// Hand an envelope to the carrier.
    fn send(&mut self, envelope: &MessageEnvelope) -> Result<Vec<String>>;

    /// Collect records that have arrived. May be empty.
    fn receive(&mut self) -> Result<Vec<WireRecord>>;

    /// Begin accepting inbound data.
    fn start_listening(&mut self) -> Result<()>;

    /// Stop accepting inbound data.
    fn stop_listening(&mut self) -> Result<()>;

    /// Whether the carrier is usable right now.
    fn is_available(&self) -> bool;
}
