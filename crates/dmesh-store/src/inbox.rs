//! Received messages.

use serde::{Deserialize, Serialize};

use dmesh_crypto::{Fingerprint, MessageId};

use crate::error::{Result, StoreError};

const INBOX_TREE: &str = "inbox";

/// A decrypted message at rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboxEntry {
    /// Message id (primary key).
    pub msg_id: MessageId,
    /// Fingerprint of the verified sender.
    pub sender_fp: Fingerprint,
    /// Decrypted content.
    pub content: String,
    /// Payload type tag.
    pub payload_type: String,
    /// Full payload JSON (content plus extras).
    pub payload_json: String,
    /// Sender's timestamp (Unix ms).
    pub ts: u64,
    /// Local receipt time (Unix ms).
    pub received_at: u64,
    /// Whether the user has read the message.
    pub read: bool,
    /// The original envelope JSON, kept for re-forwarding and audit.
    pub original_envelope: String,
}

/// The inbox table.
#[derive(Debug, Clone)]
pub struct Inbox {
    tree: sled::Tree,
}

impl Inbox {
    /// Open the inbox tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(INBOX_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open inbox tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Store a received message. Idempotent per message id.
    pub fn add(&self, entry: &InboxEntry) -> Result<bool> {
        let key = entry.msg_id.as_bytes();
        if self.tree.get(key)?.is_some() {
            return Ok(false);
        }
        let bytes = bincode::serialize(entry)?;
        self.tree.insert(key, bytes)?;
        Ok(true)
    }

    /// Load a message by id.
    pub fn get(&self, msg_id: &MessageId) -> Result<Option<InboxEntry>> {
        match self.tree.get(msg_id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All messages, newest received first.
    pub fn all(&self) -> Result<Vec<InboxEntry>> {
        let mut entries = self.collect(|_| true)?;
        entries.sort_by_key(|e| std::cmp::Reverse(e.received_at));
        Ok(entries)
    }

    /// Unread messages, oldest received first.
    pub fn unread(&self) -> Result<Vec<InboxEntry>> {
        let mut entries = self.collect(|e| !e.read)?;
        entries.sort_by_key(|e| e.received_at);
        Ok(entries)
    }

    /// Messages from one sender, newest first.
    pub fn from_sender(&self, fp: &Fingerprint) -> Result<Vec<InboxEntry>> {
        let mut entries = self.collect(|e| &e.sender_fp == fp)?;
        entries.sort_by_key(|e| std::cmp::Reverse(e.received_at));
        Ok(entries)
    }

    /// Messages of one payload type, newest first.
    pub fn by_type(&self, payload_type: &str) -> Result<Vec<InboxEntry>> {
        let mut entries = self.collect(|e| e.payload_type == payload_type)?;
        entries.sort_by_key(|e| std::cmp::Reverse(e.received_at));
        Ok(entries)
    }

    /// Mark a message read.
    pub fn mark_read(&self, msg_id: &MessageId) -> Result<()> {
        let mut entry = self
            .get(msg_id)?
            .ok_or_else(|| StoreError::NotFound(format!("inbox {}", msg_id)))?;
        entry.read = true;
        let bytes = bincode::serialize(&entry)?;
        self.tree.insert(msg_id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Delete a message.
    pub fn delete(&self, msg_id: &MessageId) -> Result<()> {
        let existed = self.tree.remove(msg_id.as_bytes())?.is_some();
        if !existed {
            return Err(StoreError::NotFound(format!("inbox {}", msg_id)));
        }
        Ok(())
    }

    fn collect(&self, keep: impl Fn(&InboxEntry) -> bool) -> Result<Vec<InboxEntry>> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let entry: InboxEntry = bincode::deserialize(&bytes)?;
            if keep(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
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

    fn test_inbox() -> (TempDir, Inbox) {
        let dir = TempDir::new().expect("temp dir");
        let db = sled::open(dir.path()).expect("open db");
        let inbox = Inbox::new(&db).expect("inbox");
        (dir, inbox)
    }

    fn sample_entry(seed: u8, received_at: u64, payload_type: &str) -> InboxEntry {
        InboxEntry {
            msg_id: message_id(&[seed]),
            sender_fp: fingerprint(&[seed; 32]),
            content: format!("message {}", seed),
            payload_type: payload_type.into(),
            payload_json: "{}".into(),
            ts: received_at.saturating_sub(10),
            received_at,
            read: false,
            original_envelope: "{}".into(),
        }
    }

    #[test]
    fn test_add_and_get() {
        let (_dir, inbox) = test_inbox();
        let entry = sample_entry(1, 100, "text");
        assert!(inbox.add(&entry).unwrap());
        assert!(!inbox.add(&entry).unwrap());
        assert_eq!(inbox.get(&entry.msg_id).unwrap().unwrap(), entry);
    }

    #[test]
    fn test_all_newest_first() {
        let (_dir, inbox) = test_inbox();
        inbox.add(&sample_entry(1, 100, "text")).unwrap();
        inbox.add(&sample_entry(2, 300, "text")).unwrap();
        inbox.add(&sample_entry(3, 200, "text")).unwrap();

        let all = inbox.all().unwrap();
        let times: Vec<_> = all.iter().map(|e| e.received_at).collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn test_unread_and_mark_read() {
        let (_dir, inbox) = test_inbox();
        let a = sample_entry(1, 100, "text");
        let b = sample_entry(2, 200, "text");
        inbox.add(&a).unwrap();
        inbox.add(&b).unwrap();

        inbox.mark_read(&a.msg_id).unwrap();
        let unread = inbox.unread().unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].msg_id, b.msg_id);
    }

    #[test]
    fn test_from_sender() {
        let (_dir, inbox) = test_inbox();
        let a = sample_entry(1, 100, "text");
        let b = sample_entry(2, 200, "text");
        inbox.add(&a).unwrap();
        inbox.add(&b).unwrap();

        let from_a = inbox.from_sender(&a.sender_fp).unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].msg_id, a.msg_id);
    }

    #[test]
    fn test_by_type() {
        let (_dir, inbox) = test_inbox();
        inbox.add(&sample_entry(1, 100, "text")).unwrap();
        inbox.add(&sample_entry(2, 200, "medical")).unwrap();

        let medical = inbox.by_type("medical").unwrap();
        assert_eq!(medical.len(), 1);
        assert_eq!(medical[0].payload_type, "medical");
    }

    #[test]
    fn test_delete() {
        let (_dir, inbox) = test_inbox();
        let entry = sample_entry(1, 100, "text");
        inbox.add(&entry).unwrap();
        inbox.delete(&entry.msg_id).unwrap();
        assert!(inbox.get(&entry.msg_id).unwrap().is_none());
        assert!(inbox.delete(&entry.msg_id).is_err());
    }

    #[test]
    fn test_missing_mark_read_errors() {
        let (_dir, inbox) = test_inbox();
        assert!(inbox.mark_read(&message_id(b"nope")).is_err());
    }
}
