//! Persistent partial-chunk buffer.
//!
//! Chunks are unsigned, so this table is the system's most exposed
//! surface: every insert validates the chunk against the set's declared
//! shape, completion detection and set removal happen in one pass, and
//! stale partials are swept after 24 hours.

use serde::{Deserialize, Serialize};

use dmesh_crypto::MessageId;
use dmesh_wire::{u32be, Chunk};

use crate::error::{Result, StoreError};

const CHUNKS_TREE: &str = "chunks";

/// Hard ceiling on a set's declared `total`.
pub const MAX_CHUNKS_PER_MESSAGE: u32 = 8192;

#[derive(Serialize, Deserialize)]
struct StoredChunk {
    seq: u32,
    total: u32,
    data: String,
    received_at: u64,
}

fn chunk_key(msg_id: &MessageId, seq: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..32].copy_from_slice(msg_id.as_bytes());
    key[32..].copy_from_slice(&u32be(seq));
    key
}

/// The partial-chunk table.
#[derive(Debug, Clone)]
pub struct ChunkBuffer {
    tree: sled::Tree,
}

impl ChunkBuffer {
    /// Open the chunks tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(CHUNKS_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open chunks tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Insert a chunk; when the set completes, remove the partials and
    /// return the full set sorted by sequence.
    ///
    /// Duplicate sequence numbers are ignored. A chunk whose `total`
    /// disagrees with the set's first-seen shape is rejected, which
    /// bounds the buffer a forger can build under one message id.
    pub fn store(&self, chunk: &Chunk, now_ms: u64) -> Result<Option<Vec<Chunk>>> {
        chunk
            .check_header()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if chunk.total == 0 || chunk.total > MAX_CHUNKS_PER_MESSAGE || chunk.seq >= chunk.total {
            return Err(StoreError::Serialization(format!(
                "chunk shape out of range: seq={} total={}",
                chunk.seq, chunk.total
            )));
        }

        let msg_id = MessageId::from_base64(&chunk.msg_id)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Shape must match whatever the set already holds.
        if let Some(item) = self.tree.scan_prefix(msg_id.as_bytes()).next() {
            let (_, bytes) = item?;
            let existing: StoredChunk = bincode::deserialize(&bytes)?;
            if existing.total != chunk.total {
                return Err(StoreError::Serialization(format!(
                    "chunk total changed from {} to {}",
                    existing.total, chunk.total
                )));
            }
        }

        let stored = StoredChunk {
            seq: chunk.seq,
            total: chunk.total,
            data: chunk.data.clone(),
            received_at: now_ms,
        };
        let key = chunk_key(&msg_id, chunk.seq);
        if self.tree.get(key)?.is_none() {
            self.tree.insert(key, bincode::serialize(&stored)?)?;
        }

        // Completion check over the prefix.
        let mut collected = Vec::new();
        for item in self.tree.scan_prefix(msg_id.as_bytes()) {
            let (key, bytes) = item?;
            let stored: StoredChunk = bincode::deserialize(&bytes)?;
            collected.push((key.to_vec(), stored));
        }
        if collected.len() < chunk.total as usize {
            return Ok(None);
        }

        let mut batch = sled::Batch::default();
        for (key, _) in &collected {
            batch.remove(key.as_slice());
        }
        self.tree.apply_batch(batch)?;

        let mut set: Vec<Chunk> = collected
            .into_iter()
            .map(|(_, s)| Chunk {
                v: dmesh_wire::limits::WIRE_VERSION,
                kind: dmesh_wire::envelope::KIND_CHUNK.into(),
                msg_id: chunk.msg_id.clone(),
                seq: s.seq,
                total: s.total,
                data: s.data,
            })
            .collect();
        set.sort_by_key(|c| c.seq);
        Ok(Some(set))
    }

    /// Receipt state for a pending message: received and missing seqs.
    pub fn progress(&self, msg_id: &MessageId) -> Result<Option<(Vec<u32>, Vec<u32>)>> {
        let mut received = Vec::new();
        let mut total = None;
        for item in self.tree.scan_prefix(msg_id.as_bytes()) {
            let (_, bytes) = item?;
            let stored: StoredChunk = bincode::deserialize(&bytes)?;
            total = Some(stored.total);
            received.push(stored.seq);
        }
        let Some(total) = total else {
            return Ok(None);
        };
        received.sort_unstable();
        let missing = (0..total).filter(|s| !received.contains(s)).collect();
        Ok(Some((received, missing)))
    }

    /// Drop partials older than `max_age_ms`; returns the removal count.
    pub fn cleanup(&self, now_ms: u64, max_age_ms: u64) -> Result<usize> {
        let mut to_remove = Vec::new();
        for item in self.tree.iter() {
            let (key, bytes) = item?;
            let stored: StoredChunk = bincode::deserialize(&bytes)?;
            if now_ms.saturating_sub(stored.received_at) > max_age_ms {
                to_remove.push(key.to_vec());
            }
        }
        let removed = to_remove.len();
        for key in to_remove {
            self.tree.remove(key)?;
        }
        Ok(removed)
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }
}
