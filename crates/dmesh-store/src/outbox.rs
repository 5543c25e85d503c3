//! The send queue.
//!
//! Outbox entries hold the canonical envelope JSON so the exact signed
//! bytes are what peers receive. Payload type and urgency are
//! denormalized onto authored entries so the sync engine can assign
//! priorities without decrypting anything; relayed entries carry no
//! payload metadata and schedule as bulk.

use serde::{Deserialize, Serialize};

use dmesh_crypto::{Fingerprint, MessageId};

use crate::error::{Result, StoreError};

const OUTBOX_TREE: &str = "outbox";

/// Delivery state of an outbox entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    /// Waiting to be offered to peers.
    Pending,
    /// Offered to at least one peer.
    Sent,
    /// Confirmed received by the recipient.
    Delivered,
    /// Given up after policy-defined retries.
    Failed,
}

impl OutboxStatus {
    /// Whether the entry should still appear in sync inventories.
    pub fn is_forwardable(&self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

/// One queued message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Message id (primary key).
    pub msg_id: MessageId,
    /// Recipient fingerprint; `None` for relayed envelopes whose
    /// recipient is not a known contact.
    pub recipient_fp: Option<Fingerprint>,
    /// Fingerprint of the envelope's author, parsed once at enqueue.
    /// Inventory construction uses it to avoid offering a peer its own
    /// messages back.
    pub sender_fp: Option<Fingerprint>,
    /// Canonical envelope JSON, exactly as signed.
    pub envelope_json: String,
    /// Expiration time (Unix ms), denormalized from the envelope.
    pub exp: u64,
    /// Payload type of authored messages (sender-side knowledge).
    pub payload_type: Option<String>,
    /// Payload urgency of authored messages, when the type carries one.
    pub urgency: Option<String>,
    /// When the entry was queued (Unix ms).
    pub created_at: u64,
    /// Delivery state.
    pub status: OutboxStatus,
    /// Number of send attempts.
    pub attempts: u32,
    /// Time of the last attempt (Unix ms).
    pub last_attempt: Option<u64>,
}

/// The outbox table.
#[derive(Debug, Clone)]
pub struct Outbox {
    tree: sled::Tree,
}

impl Outbox {
    /// Open the outbox tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(OUTBOX_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open outbox tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Queue an entry. Idempotent per message id: re-adding an existing
    /// id leaves the stored entry untouched.
    pub fn add(&self, entry: &OutboxEntry) -> Result<bool> {
        let key = entry.msg_id.as_bytes();
        if self.tree.get(key)?.is_some() {
            return Ok(false);
        }
        let bytes = bincode::serialize(entry)?;
        self.tree.insert(key, bytes)?;
        Ok(true)
    }

    /// Load an entry by message id.
    pub fn get(&self, msg_id: &MessageId) -> Result<Option<OutboxEntry>> {
        match self.tree.get(msg_id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Entries still eligible for forwarding (Pending or Sent), oldest
    /// first.
    pub fn pending(&self) -> Result<Vec<OutboxEntry>> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let entry: OutboxEntry = bincode::deserialize(&bytes)?;
            if entry.status.is_forwardable() {
                entries.push(entry);
            }
        }
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Entries addressed to a specific recipient.
    pub fn for_recipient(&self, fp: &Fingerprint) -> Result<Vec<OutboxEntry>> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let entry: OutboxEntry = bincode::deserialize(&bytes)?;
            if entry.recipient_fp.as_ref() == Some(fp) {
                entries.push(entry);
            }
        }
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Update an entry's delivery state.
    pub fn update_status(&self, msg_id: &MessageId, status: OutboxStatus) -> Result<()> {
        let mut entry = self
            .get(msg_id)?
            .ok_or_else(|| StoreError::NotFound(format!("outbox {}", msg_id)))?;
        entry.status = status;
        let bytes = bincode::serialize(&entry)?;
        self.tree.insert(msg_id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Record a send attempt (bumps the counter and timestamp).
    pub fn record_attempt(&self, msg_id: &MessageId, now_ms: u64) -> Result<()> {
        let mut entry = self
            .get(msg_id)?
            .ok_or_else(|| StoreError::NotFound(format!("outbox {}", msg_id)))?;
        entry.attempts += 1;
        entry.last_attempt = Some(now_ms);
        let bytes = bincode::serialize(&entry)?;
        self.tree.insert(msg_id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove an entry.
    pub fn remove(&self, msg_id: &MessageId) -> Result<()> {
        let existed = self.tree.remove(msg_id.as_bytes())?.is_some();
        if !existed {
            return Err(StoreError::NotFound(format!("outbox {}", msg_id)));
        }
        Ok(())
    }

    /// Drop entries whose expiry has passed; returns the removal count.
    pub fn cleanup_expired(&self, now_ms: u64) -> Result<usize> {
        let mut to_remove = Vec::new();
        for item in self.tree.iter() {
            let (key, bytes) = item?;
            let entry: OutboxEntry = bincode::deserialize(&bytes)?;
            if entry.exp < now_ms {
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
