//! Incremental chunk collection with DoS bounds.
//!
//! Chunks are unsigned, so an adversary can feed garbage to grow the
//! pending buffer. The collector bounds concurrent pending messages,
//! enforces per-message total consistency (a chunk set can never grow
//! past the size its first chunk declared), and expires stale partials.

use std::collections::HashMap;

use dmesh_wire::{Chunk, MessageEnvelope};

use crate::chunker::reassemble;
use crate::error::{ChunkError, Result};

/// Hard ceiling on `total` no matter what a chunk declares.
///
/// A 150 KiB message chunked for a 200-byte LoRa MTU needs about 4100
/// chunks; double that for headroom.
pub const MAX_CHUNKS_PER_MESSAGE: u32 = 8192;

/// Default ceiling on concurrently pending messages.
pub const MAX_PENDING_MESSAGES: usize = 64;

/// Bounds for a [`ChunkCollector`].
#[derive(Clone, Copy, Debug)]
pub struct CollectorConfig {
    /// Most messages tracked at once; further ids are rejected.
    pub max_pending: usize,
    /// Partials older than this are dropped by [`ChunkCollector::expire`].
    pub max_age_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_pending: MAX_PENDING_MESSAGES,
            max_age_ms: dmesh_wire::limits::CHUNK_RETENTION_MS,
        }
    }
}

/// Receipt state of one partially collected message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Sequence numbers received so far, ascending.
    pub received: Vec<u32>,
    /// Sequence numbers still missing, ascending.
    pub missing: Vec<u32>,
    /// Declared set size.
    pub total: u32,
}

#[derive(Debug)]
struct Pending {
    total: u32,
    chunks: HashMap<u32, Chunk>,
    first_received_ms: u64,
}

/// Collects chunks across arrivals and yields the envelope when a set
/// completes.
#[derive(Debug, Default)]
pub struct ChunkCollector {
    pending: HashMap<String, Pending>,
    config: CollectorConfig,
}

impl ChunkCollector {
    /// Create a collector with default bounds.
    pub fn new() -> Self {
        Self::with_config(CollectorConfig::default())
    }

    /// Create a collector with explicit bounds.
    pub fn with_config(config: CollectorConfig) -> Self {
        Self {
            pending: HashMap::new(),
            config,
        }
    }

    /// Add one chunk; returns the reassembled envelope when the set
    /// completes. Duplicate sequence numbers are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidMessageFormat` for malformed chunks, `TooManyPending`
    /// when the collector is full, `MessageIdMismatch` when the
    /// completed set does not hash to its declared id.
    pub fn add(&mut self, chunk: Chunk, now_ms: u64) -> Result<Option<MessageEnvelope>> {
        chunk.check_header()?;
        if chunk.total == 0 || chunk.total > MAX_CHUNKS_PER_MESSAGE {
            return Err(ChunkError::InvalidChunk(format!(
                "total {} out of range",
                chunk.total
            )));
        }
        if chunk.seq >= chunk.total {
            return Err(ChunkError::InvalidChunk(format!(
                "seq {} >= total {}",
                chunk.seq, chunk.total
            )));
        }

        if !self.pending.contains_key(&chunk.msg_id) && self.pending.len() >= self.config.max_pending
        {
            return Err(ChunkError::TooManyPending {
                max: self.config.max_pending,
            });
        }

        let entry = self
            .pending
            .entry(chunk.msg_id.clone())
            .or_insert_with(|| Pending {
                total: chunk.total,
                chunks: HashMap::new(),
                first_received_ms: now_ms,
            });

        // A set can never change shape after its first chunk.
        if chunk.total != entry.total {
            return Err(ChunkError::InvalidChunk(format!(
                "total changed from {} to {}",
                entry.total, chunk.total
            )));
        }

        entry.chunks.entry(chunk.seq).or_insert(chunk);

        if entry.chunks.len() == entry.total as usize {
            let msg_id = entry
                .chunks
                .values()
                .next()
                .map(|c| c.msg_id.clone())
                .expect("complete set is non-empty");
            let set = self
                .pending
                .remove(&msg_id)
                .expect("entry exists")
                .chunks
                .into_values()
                .collect::<Vec<_>>();
            return reassemble(&set).map(Some);
        }

        Ok(None)
    }

    /// Receipt progress for a pending message id (base64).
    pub fn progress(&self, msg_id: &str) -> Option<ChunkProgress> {
        let pending = self.pending.get(msg_id)?;
        let mut received: Vec<u32> = pending.chunks.keys().copied().collect();
        received.sort_unstable();
        let missing = (0..pending.total)
            .filter(|seq| !pending.chunks.contains_key(seq))
            .collect();
        Some(ChunkProgress {
            received,
            missing,
            total: pending.total,
        })
    }

    /// Drop partials older than the configured age; returns how many
    /// messages were discarded.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let max_age = self.config.max_age_ms;
        let before = self.pending.len();
        self.pending
            .retain(|_, p| now_ms.saturating_sub(p.first_received_ms) <= max_age);
        before - self.pending.len()
    }

    /// Number of messages currently pending.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
