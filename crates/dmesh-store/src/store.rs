//! The top-level store: one sled database, one tree per collection.

use std::path::Path;

use tracing::{debug, info};

use dmesh_wire::limits::{CHUNK_RETENTION_MS, SEEN_RETENTION_MS};
use dmesh_wire::time::now_ms;

use crate::chunks::ChunkBuffer;
use crate::contacts::ContactStore;
use crate::error::{Result, StoreError};
use crate::inbox::Inbox;
use crate::keys::KeyStore;
use crate::outbox::Outbox;
use crate::seen::{ForwardedSet, SeenSet};

/// Per-table record counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Contacts recorded.
    pub contacts: usize,
    /// Outbox entries.
    pub outbox: usize,
    /// Inbox entries.
    pub inbox: usize,
    /// Seen pairs.
    pub seen: usize,
    /// Forwarding receipts.
    pub forwarded: usize,
    /// Pending partial chunks.
    pub chunks: usize,
}

/// All persistent collections of one dmesh node.
#[derive(Debug, Clone)]
pub struct Store {
    db: sled::Db,
    /// Own key material.
    pub keys: KeyStore,
    /// Known peers.
    pub contacts: ContactStore,
    /// The send queue.
    pub outbox: Outbox,
    /// Received messages.
    pub inbox: Inbox,
    /// Replay deduplication.
    pub seen: SeenSet,
    /// Per-peer forwarding receipts.
    pub forwarded: ForwardedSet,
    /// Partial chunk sets.
    pub chunks: ChunkBuffer,
}

impl Store {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Database(format!("failed to open database: {}", e)))?;
        Self::from_db(db)
    }

    /// Open a store over an already-open database.
    pub fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            keys: KeyStore::new(&db)?,
            contacts: ContactStore::new(&db)?,
            outbox: Outbox::new(&db)?,
            inbox: Inbox::new(&db)?,
            seen: SeenSet::new(&db)?,
            forwarded: ForwardedSet::new(&db)?,
            chunks: ChunkBuffer::new(&db)?,
            db,
        })
    }

    /// Open a temporary in-memory store (tests and ephemeral nodes).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Database(format!("failed to open temp database: {}", e)))?;
        Self::from_db(db)
    }

    /// Run the periodic sweeps: expired seen pairs, stale partial
    /// chunks, and expired outbox entries.
    pub fn run_maintenance(&self) -> Result<()> {
        let now = now_ms();
        let seen = self.seen.cleanup(now, SEEN_RETENTION_MS)?;
        let chunks = self.chunks.cleanup(now, CHUNK_RETENTION_MS)?;
        let outbox = self.outbox.cleanup_expired(now)?;
        debug!(seen, chunks, outbox, "maintenance sweep complete");
        Ok(())
    }

    /// Record counts per table.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            contacts: self.contacts.tree().len(),
            outbox: self.outbox.tree().len(),
            inbox: self.inbox.tree().len(),
            seen: self.seen.tree().len(),
            forwarded: self.forwarded.tree().len(),
            chunks: self.chunks.tree().len(),
        }
    }

    /// Clear every collection, keys included.
    ///
    /// This is the explicit-reset path: identity destruction clears all
    /// derived state with it.
    pub fn reset(&self) -> Result<()> {
        for tree in [
            self.keys.tree(),
            self.contacts.tree(),
            self.outbox.tree(),
            self.inbox.tree(),
            self.seen.tree(),
            self.forwarded.tree(),
            self.chunks.tree(),
        ] {
            tree.clear()?;
        }
        self.db.flush()?;
        info!("store reset: all collections cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::Contact;
    use crate::keys::OwnKeys;
    use dmesh_crypto::{fingerprint, message_id};

    #[test]
    fn test_open_temporary_and_stats() {
        let store = Store::open_temporary().unwrap();
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_collections_share_one_db() {
        let store = Store::open_temporary().unwrap();

        let sign_pk = [1u8; 32];
        store
            .contacts
            .save_contact(&Contact::new(
                fingerprint(&sign_pk),
                sign_pk,
                [2; 32],
                "Bob",
                100,
            ))
            .unwrap();
        store
            .seen
            .check_and_mark(&message_id(b"m"), &fingerprint(&sign_pk), 100)
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.seen, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = Store::open_temporary().unwrap();
        store
            .keys
            .put_own_keys(&OwnKeys {
                sign_sk: vec![0; 64],
                box_sk: vec![0; 32],
                display_name: "me".into(),
                created_at: 1,
            })
            .unwrap();
        store
            .seen
            .check_and_mark(&message_id(b"m"), &fingerprint(&[1; 32]), 100)
            .unwrap();

        store.reset().unwrap();
        assert!(store.keys.get_own_keys().unwrap().is_none());
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_maintenance_runs() {
        let store = Store::open_temporary().unwrap();
        store.run_maintenance().unwrap();
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store
                .keys
                .put_own_keys(&OwnKeys {
                    sign_sk: vec![7; 64],
                    box_sk: vec![8; 32],
                    display_name: "me".into(),
                    created_at: 1,
                })
                .unwrap();
        }
        let store = Store::open(dir.path()).unwrap();
        let keys = store.keys.get_own_keys().unwrap().unwrap();
        assert_eq!(keys.sign_sk, vec![7; 64]);
    }
}
