//! Own-key persistence.
//!
//! The node's long-term secrets live here only when the caller opts in;
//! nothing else in the workspace serializes secret material.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, StoreError};

const KEYS_TREE: &str = "own_keys";
const OWN_KEY: &[u8] = b"own";

/// The node's own key material and display name.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct OwnKeys {
    /// Ed25519 secret encoding (64 bytes: seed plus public half).
    pub sign_sk: Vec<u8>,
    /// X25519 secret key (32 bytes).
    pub box_sk: Vec<u8>,
    /// Display name used on the identity card.
    pub display_name: String,
    /// Creation time, Unix milliseconds.
    pub created_at: u64,
}

impl std::fmt::Debug for OwnKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnKeys")
            .field("display_name", &self.display_name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// The keys table.
#[derive(Debug, Clone)]
pub struct KeyStore {
    tree: sled::Tree,
}

impl KeyStore {
    /// Open the keys tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(KEYS_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open keys tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Persist the node's keys, replacing any previous record.
    pub fn put_own_keys(&self, keys: &OwnKeys) -> Result<()> {
        let bytes = bincode::serialize(keys)?;
        self.tree.insert(OWN_KEY, bytes)?;
        Ok(())
    }

    /// Load the node's keys, if any were persisted.
    pub fn get_own_keys(&self) -> Result<Option<OwnKeys>> {
        match self.tree.get(OWN_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete the node's keys.
    pub fn delete_own_keys(&self) -> Result<()> {
        self.tree.remove(OWN_KEY)?;
        Ok(())
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }
}
