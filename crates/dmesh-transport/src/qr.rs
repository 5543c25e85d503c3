//! QR transport.
//!
//! One-way per sweep: `send` returns the JSON strings an external
//! renderer turns into QR frames; an external scanner feeds decoded
//! text back through [`QrTransport::process_scanned`]. Envelopes larger
//! than a frame are chunked, and scanned chunks are collected until the
//! set completes.

use dmesh_chunk::{ChunkCollector, ChunkProgress};
use dmesh_wire::limits::QR_MAX_CHUNK;
use dmesh_wire::time::now_ms;
use dmesh_wire::{MessageEnvelope, WireRecord};
use tracing::debug;

use crate::error::Result;
use crate::transport::{Transport, TransportCapabilities};

/// The QR adapter.
pub struct QrTransport {
    max_frame_size: usize,
    collector: ChunkCollector,
    inbound: Vec<WireRecord>,
    listening: bool,
}

impl Default for QrTransport {
    fn default() -> Self {
        Self::new(QR_MAX_CHUNK)
    }
}

impl QrTransport {
    /// Create an adapter with an explicit frame ceiling.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            collector: ChunkCollector::new(),
            inbound: Vec::new(),
            listening: false,
        }
    }

    /// Feed one scanned frame's text.
    ///
    /// Returns the envelope when this scan completes one — either a
    /// whole-envelope frame or the final chunk of a set — and `None`
    /// while still collecting. Completed records are also queued for
    /// [`Transport::receive`].
    pub fn process_scanned(&mut self, data: &str) -> Result<Option<MessageEnvelope>> {
        match WireRecord::parse(data)? {
            WireRecord::Message(env) => {
                self.inbound.push(WireRecord::Message(env.clone()));
                Ok(Some(env))
            }
            WireRecord::Chunk(chunk) => {
                let msg_id = chunk.msg_id.clone();
                match self.collector.add(chunk, now_ms())? {
                    Some(env) => {
                        debug!(msg_id = %msg_id, "chunk set complete");
                        self.inbound.push(WireRecord::Message(env.clone()));
                        Ok(Some(env))
                    }
                    None => Ok(None),
                }
            }
            record @ WireRecord::Identity(_) => {
                self.inbound.push(record);
                Ok(None)
            }
            // Sync frames do not travel over QR sweeps.
            _ => Ok(None),
        }
    }

    /// Receipt progress for a partially scanned message (base64 id).
    pub fn chunk_progress(&self, msg_id: &str) -> Option<ChunkProgress> {
        self.collector.progress(msg_id)
    }

    /// Drop stale partial scans.
    pub fn expire_partials(&mut self) -> usize {
        self.collector.expire(now_ms())
    }
}

impl Transport for QrTransport {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_payload_size: self.max_frame_size,
            supports_chunking: true,
            bidirectional: false,
            realtime: true,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&mut self, envelope: &MessageEnvelope) -> Result<Vec<String>> {
        let json = envelope.to_json();
        if json.len() <= self.max_frame_size {
            return Ok(vec![json]);
        }
        let chunks = dmesh_chunk::chunk(envelope, self.max_frame_size)?;
        Ok(chunks.iter().map(|c| c.to_json()).collect())
    }

    fn receive(&mut self) -> Result<Vec<WireRecord>> {
        Ok(std::mem::take(&mut self.inbound))
    }

    fn start_listening(&mut self) -> Result<()> {
        self.listening = true;
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<()> {
        self.listening = false;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}
