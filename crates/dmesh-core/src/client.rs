//! The dmesh client.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use dmesh_crypto::{
    create_public_identity, decrypt, encrypt, fingerprint, safety_number, verify_envelope,
    BoxKeyPair, DecryptOptions, EncryptOptions, Fingerprint, MessageId, SigningKeyPair,
    ValidityMode,
};
use dmesh_store::{
    Contact, InboxEntry, OutboxEntry, OutboxStatus, OwnKeys, Store, StoreStats, VerificationStatus,
};
use dmesh_sync::{CancelToken, SyncConfig, SyncEngine};
use dmesh_transport::FrameChannel;
use dmesh_wire::encoding::from_base64_exact;
use dmesh_wire::limits::{BOX_PK_LEN, SIGN_PK_LEN};
use dmesh_wire::time::now_ms;
use dmesh_wire::{to_base64, MessageEnvelope, PublicIdentity, WireRecord};

use crate::error::{CoreError, Result};

/// How to treat senders with no recorded contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Refuse messages from unknown senders.
    RequireKnownContact,
    /// Pin an unknown sender's keys on first valid message.
    #[default]
    TrustOnFirstUse,
}

/// Optional knobs for [`DmeshClient::send_message`].
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    /// Payload type tag; defaults to `text`.
    pub payload_type: Option<String>,
    /// Urgency extra, for `need_help` and `medical` payloads.
    pub urgency: Option<String>,
    /// Time-to-live override.
    pub ttl_ms: Option<u64>,
    /// Further payload extras.
    pub extra: Option<Map<String, Value>>,
}

/// What one inbound record turned into.
#[derive(Debug)]
pub enum Incoming {
    /// A message for us, decrypted, verified, and stored.
    Message(InboxEntry),
    /// An identity card, pinned or refreshed as a contact.
    Contact(Contact),
    /// A chunk was absorbed; the set is still incomplete.
    ChunkPending {
        /// base64 message id of the pending set.
        msg_id: String,
        /// Sequence numbers received so far.
        received: Vec<u32>,
        /// Sequence numbers still missing.
        missing: Vec<u32>,
    },
    /// An envelope for a third party, verified and queued for
    /// forwarding.
    Relayed(MessageId),
    /// Already seen; nothing was written.
    Duplicate,
    /// Not a record this surface handles (sync frames).
    Ignored,
}

/// One node: identity, store, and the flows between them.
pub struct DmeshClient {
    store: Store,
    sign: SigningKeyPair,
    boxk: BoxKeyPair,
    display_name: String,
}

impl std::fmt::Debug for DmeshClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmeshClient")
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl DmeshClient {
    /// Create a fresh identity in an empty store.
    pub fn create(store: Store, display_name: &str) -> Result<Self> {
        let sign = SigningKeyPair::generate();
        let boxk = BoxKeyPair::generate();
        store.keys.put_own_keys(&OwnKeys {
            sign_sk: sign.secret_bytes().to_vec(),
            box_sk: boxk.secret_bytes().to_vec(),
            display_name: display_name.to_string(),
            created_at: now_ms(),
        })?;
        info!(fp = %fingerprint(&sign.public_bytes()), "identity created");
        Ok(Self {
            store,
            sign,
            boxk,
            display_name: display_name.to_string(),
        })
    }

    /// Load the identity persisted in a store.
    ///
    /// # Errors
    ///
    /// `NoIdentity` when the store holds no keys.
    pub fn load(store: Store) -> Result<Self> {
        let keys = store.keys.get_own_keys()?.ok_or(CoreError::NoIdentity)?;
        let sign = SigningKeyPair::from_secret_bytes(&keys.sign_sk)?;
        let boxk = BoxKeyPair::from_secret_bytes(&keys.box_sk)?;
        Ok(Self {
            store,
            sign,
            boxk,
            display_name: keys.display_name.clone(),
        })
    }

    /// Load the stored identity, or create one if none exists.
    pub fn open(store: Store, display_name: &str) -> Result<Self> {
        if store.keys.get_own_keys()?.is_some() {
            Self::load(store)
        } else {
            Self::create(store, display_name)
        }
    }

    /// Our fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.sign.public_bytes())
    }

    /// Our shareable identity card.
    pub fn public_identity(&self) -> PublicIdentity {
        create_public_identity(
            &self.display_name,
            &self.sign.public_bytes(),
            &self.boxk.public_bytes(),
        )
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    // === Sending ===

    /// Encrypt a message for a known contact and queue it for
    /// forwarding.
    ///
    /// # Errors
    ///
    /// `UnknownSender` when no contact matches; `ContactCompromised`
    /// when the contact's keys are marked compromised.
    pub fn send_message(
        &self,
        recipient_fp: &Fingerprint,
        content: &str,
        opts: SendOptions,
    ) -> Result<MessageId> {
        let contact = self
            .store
            .contacts
            .get_contact(recipient_fp)?
            .ok_or_else(|| CoreError::UnknownSender(recipient_fp.to_hex()))?;
        if contact.verification == VerificationStatus::Compromised {
            return Err(CoreError::ContactCompromised(recipient_fp.to_hex()));
        }

        let mut extra = opts.extra.unwrap_or_default();
        if let Some(urgency) = &opts.urgency {
            extra.insert("urgency".into(), Value::String(urgency.clone()));
        }
        let envelope = encrypt(
            content,
            &self.sign,
            &self.boxk,
            &contact.box_pk,
            EncryptOptions {
                ttl_ms: opts.ttl_ms,
                payload_type: opts.payload_type.clone(),
                extra: if extra.is_empty() { None } else { Some(extra) },
                ..Default::default()
            },
        )?;

        let msg_id = MessageId::from_base64(envelope.msg_id.as_ref().expect("always set"))?;
        self.store.outbox.add(&OutboxEntry {
            msg_id,
            recipient_fp: Some(*recipient_fp),
            sender_fp: Some(self.fingerprint()),
            exp: envelope.exp.expect("always set"),
            envelope_json: envelope.to_json(),
            payload_type: Some(
                opts.payload_type
                    .unwrap_or_else(|| dmesh_wire::payload::TYPE_TEXT.into()),
            ),
            urgency: opts.urgency,
            created_at: now_ms(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_attempt: None,
        })?;
        debug!(msg_id = %msg_id, recipient = %recipient_fp, "message queued");
        Ok(msg_id)
    }

    // === Receiving ===

    /// Process one inbound record from any transport.
    pub fn process_incoming(&self, record: WireRecord, policy: TrustPolicy) -> Result<Incoming> {
        match record {
            WireRecord::Identity(identity) => self.absorb_identity(&identity),
            WireRecord::Message(envelope) => self.absorb_envelope(&envelope, policy),
            WireRecord::Chunk(chunk) => {
                match self.store.chunks.store(&chunk, now_ms())? {
                    Some(set) => {
                        let envelope = dmesh_chunk::reassemble(&set)?;
                        self.absorb_envelope(&envelope, policy)
                    }
                    None => {
                        let msg_id = MessageId::from_base64(&chunk.msg_id)?;
                        let (received, missing) = self
                            .store
                            .chunks
                            .progress(&msg_id)?
                            .unwrap_or_default();
                        Ok(Incoming::ChunkPending {
                            msg_id: chunk.msg_id,
                            received,
                            missing,
                        })
                    }
                }
            }
            _ => Ok(Incoming::Ignored),
        }
    }

    fn absorb_identity(&self, identity: &PublicIdentity) -> Result<Incoming> {
        let sign_pk_bytes = from_base64_exact(&identity.sign_pk, SIGN_PK_LEN)?;
        let mut sign_pk = [0u8; 32];
        sign_pk.copy_from_slice(&sign_pk_bytes);
        let box_pk_bytes = from_base64_exact(&identity.box_pk, BOX_PK_LEN)?;
        let mut box_pk = [0u8; 32];
        box_pk.copy_from_slice(&box_pk_bytes);

        // The card's fingerprint must be the key's fingerprint.
        let claimed = Fingerprint::from_base64(&identity.fp)?;
        let derived = fingerprint(&sign_pk);
        if claimed != derived {
            return Err(CoreError::Wire(dmesh_wire::WireError::InvalidMessageFormat(
                "identity fingerprint does not match signing key".into(),
            )));
        }

        let now = now_ms();
        let contact = match self.store.contacts.get_contact(&derived)? {
            Some(mut existing) => {
                // Same keys enforced by the store; refresh the name.
                existing.display_name = identity.name.clone();
                existing.updated_at = now;
                existing.sign_pk = sign_pk;
                existing.box_pk = box_pk;
                self.store.contacts.save_contact(&existing)?;
                existing
            }
            None => {
                let contact = Contact::new(derived, sign_pk, box_pk, &identity.name, now);
                self.store.contacts.save_contact(&contact)?;
                info!(fp = %derived, name = identity.name.as_str(), "contact added");
                contact
            }
        };
        Ok(Incoming::Contact(contact))
    }

    fn absorb_envelope(
        &self,
        envelope: &MessageEnvelope,
        policy: TrustPolicy,
    ) -> Result<Incoming> {
        let our_box_pk = to_base64(&self.boxk.public_bytes());
        if envelope.recipient_box_pk == our_box_pk {
            self.absorb_own_message(envelope, policy)
        } else {
            self.absorb_relay(envelope)
        }
    }

    fn absorb_own_message(
        &self,
        envelope: &MessageEnvelope,
        policy: TrustPolicy,
    ) -> Result<Incoming> {
        // Cheap sender lookup before any crypto: the pinned keys feed
        // the continuity check.
        let sender_pk_bytes = from_base64_exact(&envelope.sender_sign_pk, SIGN_PK_LEN)?;
        let mut sender_pk = [0u8; 32];
        sender_pk.copy_from_slice(&sender_pk_bytes);
        let sender_fp = fingerprint(&sender_pk);
        let contact = self.store.contacts.get_contact(&sender_fp)?;

        match (&contact, policy) {
            (None, TrustPolicy::RequireKnownContact) => {
                return Err(CoreError::UnknownSender(sender_fp.to_hex()));
            }
            (Some(c), _) if c.verification == VerificationStatus::Compromised => {
                return Err(CoreError::ContactCompromised(sender_fp.to_hex()));
            }
            _ => {}
        }

        let message = decrypt(
            envelope,
            &self.boxk,
            DecryptOptions {
                mode: ValidityMode::DelayTolerant,
                expected_sender_sign_pk: contact.as_ref().map(|c| c.sign_pk),
                expected_sender_box_pk: contact.as_ref().map(|c| c.box_pk),
                replay: Some(&self.store.seen),
                now_ms: None,
            },
        )?;

        // Trust on first use: pin the observed keys.
        if contact.is_none() {
            let name = format!("~{}", &message.sender_fp.to_hex()[..8]);
            self.store.contacts.save_contact(&Contact::new(
                message.sender_fp,
                message.sender_sign_pk,
                message.sender_box_pk,
                &name,
                now_ms(),
            ))?;
            info!(fp = %message.sender_fp, "sender pinned on first use");
        }

        let entry = InboxEntry {
            msg_id: message.msg_id,
            sender_fp: message.sender_fp,
            content: message.content.clone(),
            payload_type: message.payload_type.clone(),
            payload_json: serde_json::to_string(&message.payload)
                .expect("payload serialization cannot fail"),
            ts: message.ts,
            received_at: now_ms(),
            read: false,
            original_envelope: envelope.to_json(),
        };
        self.store.inbox.add(&entry)?;
        debug!(msg_id = %entry.msg_id, "message stored");
        Ok(Incoming::Message(entry))
    }

    fn absorb_relay(&self, envelope: &MessageEnvelope) -> Result<Incoming> {
        // Never carry what cannot be authenticated.
        let verified = verify_envelope(envelope, ValidityMode::DelayTolerant, None)?;

        if !self
            .store
            .seen
            .check_and_mark(&verified.msg_id, &verified.sender_fp, now_ms())?
        {
            return Ok(Incoming::Duplicate);
        }

        let recipient_fp = self
            .store
            .contacts
            .find_by_box_pk(&verified.recipient_box_pk)?
            .map(|c| c.fp);
        self.store.outbox.add(&OutboxEntry {
            msg_id: verified.msg_id,
            recipient_fp,
            sender_fp: Some(verified.sender_fp),
            envelope_json: envelope.to_json(),
            exp: verified.exp,
            payload_type: None,
            urgency: None,
            created_at: now_ms(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_attempt: None,
        })?;
        debug!(msg_id = %verified.msg_id, "envelope queued for forwarding");
        Ok(Incoming::Relayed(verified.msg_id))
    }

    // === Contacts ===

    /// The safety number shared with a known contact.
    pub fn safety_number_with(&self, fp: &Fingerprint) -> Result<String> {
        let contact = self
            .store
            .contacts
            .get_contact(fp)?
            .ok_or_else(|| CoreError::UnknownSender(fp.to_hex()))?;
        Ok(safety_number(&self.fingerprint(), &contact.fp))
    }

    /// Mark a contact verified after an out-of-band comparison.
    pub fn verify_contact(&self, fp: &Fingerprint) -> Result<()> {
        Ok(self.store.contacts.verify_contact(fp, now_ms())?)
    }

    /// Mark a contact compromised.
    pub fn mark_compromised(&self, fp: &Fingerprint, reason: Option<&str>) -> Result<()> {
        Ok(self.store.contacts.mark_compromised(fp, reason, now_ms())?)
    }

    /// All recorded contacts.
    pub fn contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.store.contacts.all_contacts()?)
    }

    // === Sync ===

    /// Build a sync engine over this node's identity and store.
    ///
    /// Hold the engine across sessions so its per-peer rate limiting
    /// accumulates.
    pub fn sync_engine(&self, config: SyncConfig) -> SyncEngine<'_> {
        SyncEngine::new(&self.store, &self.sign, config)
    }

    /// Run one sync session and fold everything received into the
    /// store: messages for us are decrypted and stored, everything else
    /// is verified and re-queued for forwarding.
    pub fn run_sync_session(
        &self,
        engine: &mut SyncEngine<'_>,
        channel: &mut dyn FrameChannel,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome> {
        let report = engine.run_session(channel, cancel)?;
        let mut outcome = SyncOutcome {
            peer_fp: report.peer_fp,
            stored: 0,
            relayed: 0,
            duplicates: 0,
        };
        for envelope in report.received {
            match self.process_incoming(WireRecord::Message(envelope), TrustPolicy::TrustOnFirstUse)
            {
                Ok(Incoming::Message(_)) => outcome.stored += 1,
                Ok(Incoming::Relayed(_)) => outcome.relayed += 1,
                Ok(Incoming::Duplicate) => outcome.duplicates += 1,
                Ok(_) => {}
                Err(e) if e.code() == "ReplayDetected" => outcome.duplicates += 1,
                Err(e) => {
                    // One bad envelope does not undo the session.
                    warn!(error = %e, "received envelope rejected");
                }
            }
        }
        Ok(outcome)
    }

    // === Housekeeping ===

    /// Run the periodic store sweeps.
    pub fn run_maintenance(&self) -> Result<()> {
        Ok(self.store.run_maintenance()?)
    }

    /// Per-table record counts.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Destroy this identity and every derived collection.
    ///
    /// The client is unusable afterwards; drop it and create anew.
    pub fn reset(self) -> Result<()> {
        self.store.reset()?;
        Ok(())
    }
}

/// What one driven sync session accomplished, after store effects.
#[derive(Debug)]
pub struct SyncOutcome {
    /// The verified peer.
    pub peer_fp: Option<Fingerprint>,
    /// Messages decrypted into our inbox.
    pub stored: usize,
    /// Envelopes re-queued for forwarding to others.
    pub relayed: usize,
    /// Envelopes we already held.
    pub duplicates: usize,
}
