//! Replay deduplication and forwarding receipts.
//!
//! The seen-set is the one global synchronization point in the system.
//! `check_and_mark` is a single sled compare-and-swap, so for a given
//! `(msg_id, sender_fp)` pair exactly one concurrent caller observes
//! `Allowed`, no matter the thread interleaving.

use dmesh_crypto::{CryptoError, Fingerprint, MessageId, ReplayGuard, ReplayVerdict};
use dmesh_wire::time::now_ms;

use crate::error::{Result, StoreError};

const SEEN_TREE: &str = "seen";
const FORWARDED_TREE: &str = "forwarded";

fn seen_key(msg_id: &MessageId, sender_fp: &Fingerprint) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..32].copy_from_slice(msg_id.as_bytes());
    key[32..].copy_from_slice(sender_fp.as_bytes());
    key
}

fn forwarded_key(peer_fp: &Fingerprint, msg_id: &MessageId) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..16].copy_from_slice(peer_fp.as_bytes());
    key[16..].copy_from_slice(msg_id.as_bytes());
    key
}

/// The seen table: `(msg_id, sender_fp)` pairs with receipt times.
#[derive(Debug, Clone)]
pub struct SeenSet {
    tree: sled::Tree,
}

impl SeenSet {
    /// Open the seen tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(SEEN_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open seen tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Atomically test-and-mark a pair.
    ///
    /// Returns `true` exactly once per pair: the compare-and-swap
    /// inserts only when no entry exists, so concurrent callers race to
    /// a single winner.
    pub fn check_and_mark(
        &self,
        msg_id: &MessageId,
        sender_fp: &Fingerprint,
        now_ms: u64,
    ) -> Result<bool> {
        let key = seen_key(msg_id, sender_fp);
        let value = bincode::serialize(&now_ms)?;
        let outcome = self
            .tree
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?;
        Ok(outcome.is_ok())
    }

    /// Whether a pair has been seen.
    pub fn has(&self, msg_id: &MessageId, sender_fp: &Fingerprint) -> Result<bool> {
        Ok(self.tree.get(seen_key(msg_id, sender_fp))?.is_some())
    }

    /// Whether any sender has delivered this message id.
    ///
    /// Used by want-selection to skip inventory items already held.
    pub fn has_msg_id(&self, msg_id: &MessageId) -> Result<bool> {
        Ok(self
            .tree
            .scan_prefix(msg_id.as_bytes())
            .next()
            .transpose()?
            .is_some())
    }

    /// Drop entries older than `max_age_ms`; returns the removal count.
    pub fn cleanup(&self, now_ms: u64, max_age_ms: u64) -> Result<usize> {
        let mut to_remove = Vec::new();
        for item in self.tree.iter() {
            let (key, bytes) = item?;
            let seen_at: u64 = bincode::deserialize(&bytes)?;
            if now_ms.saturating_sub(seen_at) > max_age_ms {
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

impl ReplayGuard for SeenSet {
    fn check_and_mark(
        &self,
        msg_id: &MessageId,
        sender_fp: &Fingerprint,
    ) -> std::result::Result<ReplayVerdict, CryptoError> {
        match SeenSet::check_and_mark(self, msg_id, sender_fp, now_ms()) {
            Ok(true) => Ok(ReplayVerdict::Allowed),
            Ok(false) => Ok(ReplayVerdict::Rejected),
            Err(e) => Err(CryptoError::StorageError(e.to_string())),
        }
    }
}

/// The forwarded table: which peers are known to hold which messages.
#[derive(Debug, Clone)]
pub struct ForwardedSet {
    tree: sled::Tree,
}

impl ForwardedSet {
    /// Open the forwarded tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(FORWARDED_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open forwarded tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Record that a peer confirmed receipt of a message. Idempotent.
    pub fn mark_forwarded(
        &self,
        peer_fp: &Fingerprint,
        msg_id: &MessageId,
        now_ms: u64,
    ) -> Result<()> {
        let value = bincode::serialize(&now_ms)?;
        self.tree.insert(forwarded_key(peer_fp, msg_id), value)?;
        Ok(())
    }

    /// Whether a peer already holds a message.
    pub fn was_forwarded(&self, peer_fp: &Fingerprint, msg_id: &MessageId) -> Result<bool> {
        Ok(self.tree.get(forwarded_key(peer_fp, msg_id))?.is_some())
    }

    /// All message ids a peer is known to hold.
    pub fn forwarded_to(&self, peer_fp: &Fingerprint) -> Result<Vec<MessageId>> {
        let mut ids = Vec::new();
        for item in self.tree.scan_prefix(peer_fp.as_bytes()) {
            let (key, _) = item?;
            let id = MessageId::from_bytes(&key[16..])
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmesh_crypto::{fingerprint, message_id};
    use tempfile::TempDir;

    fn test_sets() -> (TempDir, SeenSet, ForwardedSet) {
        let dir = TempDir::new().expect("temp dir");
        let db = sled::open(dir.path()).expect("open db");
        let seen = SeenSet::new(&db).expect("seen");
        let forwarded = ForwardedSet::new(&db).expect("forwarded");
        (dir, seen, forwarded)
    }

    #[test]
    fn test_check_and_mark_once() {
        let (_dir, seen, _) = test_sets();
        let id = message_id(b"m");
        let fp = fingerprint(&[1; 32]);

        assert!(seen.check_and_mark(&id, &fp, 100).unwrap());
        assert!(!seen.check_and_mark(&id, &fp, 200).unwrap());
        assert!(seen.has(&id, &fp).unwrap());
    }

    #[test]
    fn test_distinct_senders_are_distinct_pairs() {
        let (_dir, seen, _) = test_sets();
        let id = message_id(b"m");
        let a = fingerprint(&[1; 32]);
        let b = fingerprint(&[2; 32]);

        assert!(seen.check_and_mark(&id, &a, 100).unwrap());
        assert!(seen.check_and_mark(&id, &b, 100).unwrap());
        assert!(seen.has_msg_id(&id).unwrap());
    }

    #[test]
    fn test_concurrent_check_and_mark_single_winner() {
        let (_dir, seen, _) = test_sets();
        let id = message_id(b"race");
        let fp = fingerprint(&[3; 32]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let seen = seen.clone();
            handles.push(std::thread::spawn(move || {
                seen.check_and_mark(&id, &fp, 100).unwrap()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_cleanup_by_age() {
        let (_dir, seen, _) = test_sets();
        let fp = fingerprint(&[1; 32]);
        seen.check_and_mark(&message_id(b"old"), &fp, 100).unwrap();
        seen.check_and_mark(&message_id(b"new"), &fp, 900).unwrap();

        let removed = seen.cleanup(1000, 500).unwrap();
        assert_eq!(removed, 1);
        assert!(!seen.has(&message_id(b"old"), &fp).unwrap());
        assert!(seen.has(&message_id(b"new"), &fp).unwrap());
    }

    #[test]
    fn test_replay_guard_adapter() {
        use dmesh_crypto::ReplayGuard;
        let (_dir, seen, _) = test_sets();
        let id = message_id(b"g");
        let fp = fingerprint(&[7; 32]);

        let guard: &dyn ReplayGuard = &seen;
        assert_eq!(
            guard.check_and_mark(&id, &fp).unwrap(),
            dmesh_crypto::ReplayVerdict::Allowed
        );
        assert_eq!(
            guard.check_and_mark(&id, &fp).unwrap(),
            dmesh_crypto::ReplayVerdict::Rejected
        );
    }

    #[test]
    fn test_forwarded_round_trip() {
        let (_dir, _, forwarded) = test_sets();
        let peer = fingerprint(&[5; 32]);
        let id = message_id(b"fwd");

        assert!(!forwarded.was_forwarded(&peer, &id).unwrap());
        forwarded.mark_forwarded(&peer, &id, 100).unwrap();
        assert!(forwarded.was_forwarded(&peer, &id).unwrap());
        // Idempotent.
        forwarded.mark_forwarded(&peer, &id, 200).unwrap();

        let ids = forwarded.forwarded_to(&peer).unwrap();
        assert_eq!(ids, vec![id]);
    }

    #[test]
    fn test_forwarded_scoped_per_peer() {
        let (_dir, _, forwarded) = test_sets();
        let peer_a = fingerprint(&[1; 32]);
        let peer_b = fingerprint(&[2; 32]);
        let id = message_id(b"x");

        forwarded.mark_forwarded(&peer_a, &id, 100).unwrap();
        assert!(forwarded.was_forwarded(&peer_a, &id).unwrap());
        assert!(!forwarded.was_forwarded(&peer_b, &id).unwrap());
        assert!(forwarded.forwarded_to(&peer_b).unwrap().is_empty());
    }
}
