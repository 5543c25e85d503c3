//! Contact records with a verification lifecycle.
//!
//! A contact is keyed by fingerprint. Once recorded, its key pair must
//! never change silently: `save_contact` rejects an update whose keys
//! differ from the pinned ones, which is the store-side half of the
//! sender-continuity check the decrypt path performs.

use serde::{Deserialize, Serialize};

use dmesh_crypto::Fingerprint;

use crate::error::{Result, StoreError};

const CONTACTS_TREE: &str = "contacts";

/// Where a contact stands in the trust lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Keys pinned on first use; never confirmed out-of-band.
    Unverified,
    /// Safety number compared out-of-band.
    Verified,
    /// Marked compromised by the user; refuse new messages.
    Compromised,
}

/// A known peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Fingerprint of the signing key (primary key).
    pub fp: Fingerprint,
    /// Pinned Ed25519 public key.
    pub sign_pk: [u8; 32],
    /// Pinned X25519 public key.
    pub box_pk: [u8; 32],
    /// Display name, from the contact's identity card.
    pub display_name: String,
    /// Trust state.
    pub verification: VerificationStatus,
    /// When the contact was first recorded (Unix ms).
    pub added_at: u64,
    /// When the record last changed (Unix ms).
    pub updated_at: u64,
    /// When the contact was verified, if ever.
    pub verified_at: Option<u64>,
    /// When the contact was marked compromised, if ever.
    pub compromised_at: Option<u64>,
    /// Why the contact was marked compromised.
    pub compromised_reason: Option<String>,
}

impl Contact {
    /// Build a fresh unverified contact.
    pub fn new(
        fp: Fingerprint,
        sign_pk: [u8; 32],
        box_pk: [u8; 32],
        display_name: &str,
        now_ms: u64,
    ) -> Self {
        Self {
            fp,
            sign_pk,
            box_pk,
            display_name: display_name.to_string(),
            verification: VerificationStatus::Unverified,
            added_at: now_ms,
            updated_at: now_ms,
            verified_at: None,
            compromised_at: None,
            compromised_reason: None,
        }
    }
}

/// The contacts table.
#[derive(Debug, Clone)]
pub struct ContactStore {
    tree: sled::Tree,
}

impl ContactStore {
    /// Open the contacts tree on a database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(CONTACTS_TREE)
            .map_err(|e| StoreError::Database(format!("failed to open contacts tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Insert or update a contact.
    ///
    /// # Errors
    ///
    /// `KeyChangeRejected` when a stored contact with the same
    /// fingerprint carries different keys — key changes must go through
    /// an explicit compromise-and-replace flow, never silently.
    pub fn save_contact(&self, contact: &Contact) -> Result<()> {
        if let Some(existing) = self.get_contact(&contact.fp)? {
            if existing.sign_pk != contact.sign_pk || existing.box_pk != contact.box_pk {
                return Err(StoreError::KeyChangeRejected(contact.fp.to_hex()));
            }
        }
        let bytes = bincode::serialize(contact)?;
        self.tree.insert(contact.fp.as_bytes(), bytes)?;
        Ok(())
    }

    /// Look up a contact by fingerprint.
    pub fn get_contact(&self, fp: &Fingerprint) -> Result<Option<Contact>> {
        match self.tree.get(fp.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All contacts, sorted by display name.
    pub fn all_contacts(&self) -> Result<Vec<Contact>> {
        let mut contacts = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            contacts.push(bincode::deserialize::<Contact>(&bytes)?);
        }
        contacts.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(contacts)
    }

    /// Contacts in a given verification state.
    pub fn contacts_where(&self, verification: VerificationStatus) -> Result<Vec<Contact>> {
        Ok(self
            .all_contacts()?
            .into_iter()
            .filter(|c| c.verification == verification)
            .collect())
    }

    /// Mark a contact verified (safety number compared out-of-band).
    pub fn verify_contact(&self, fp: &Fingerprint, now_ms: u64) -> Result<()> {
        let mut contact = self
            .get_contact(fp)?
            .ok_or_else(|| StoreError::NotFound(format!("contact {}", fp.to_hex())))?;
        contact.verification = VerificationStatus::Verified;
        contact.verified_at = Some(now_ms);
        contact.updated_at = now_ms;
        let bytes = bincode::serialize(&contact)?;
        self.tree.insert(fp.as_bytes(), bytes)?;
        Ok(())
    }

    /// Mark a contact compromised.
    pub fn mark_compromised(
        &self,
        fp: &Fingerprint,
        reason: Option<&str>,
        now_ms: u64,
    ) -> Result<()> {
        let mut contact = self
            .get_contact(fp)?
            .ok_or_else(|| StoreError::NotFound(format!("contact {}", fp.to_hex())))?;
        contact.verification = VerificationStatus::Compromised;
        contact.compromised_at = Some(now_ms);
        contact.compromised_reason = reason.map(str::to_string);
        contact.updated_at = now_ms;
        let bytes = bincode::serialize(&contact)?;
        self.tree.insert(fp.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove a contact.
    pub fn delete_contact(&self, fp: &Fingerprint) -> Result<()> {
        let existed = self.tree.remove(fp.as_bytes())?.is_some();
        if !existed {
            return Err(StoreError::NotFound(format!("contact {}", fp.to_hex())));
        }
        Ok(())
    }

    /// Find the contact whose box key matches, if any.
    ///
    /// Used to attribute relayed envelopes to a known recipient.
    pub fn find_by_box_pk(&self, box_pk: &[u8; 32]) -> Result<Option<Contact>> {
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let contact: Contact = bincode::deserialize(&bytes)?;
            if &contact.box_pk == box_pk {
                return Ok(Some(contact));
            }
        }
        Ok(None)
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }
}
