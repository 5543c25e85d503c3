//! The per-session sync state machine.
//!
//! A session is symmetric: both peers HELLO, both may offer (INV →
//! GET → DATA → ACK serving the peer) and fetch (the same leg in the
//! other direction), and the two legs run interleaved over one
//! channel. The machine is purely frame-driven — it never blocks — so
//! the caller owns pacing, timeouts, and cancellation.
//!
//! Any invalid, unverifiable, or out-of-phase frame aborts the session;
//! an aborted session makes no further store writes.

use std::collections::HashSet;

use tracing::{debug, warn};

use dmesh_chunk::ChunkCollector;
use dmesh_crypto::{fingerprint, Fingerprint, SigningKeyPair};
use dmesh_store::{OutboxStatus, Store};
use dmesh_wire::encoding::from_base64_exact;
use dmesh_wire::frames::{KIND_ACK, KIND_DATA, KIND_GET, KIND_HELLO, KIND_INV};
use dmesh_wire::limits::{CHUNK_OVERHEAD, SIGN_PK_LEN, WIRE_VERSION};
use dmesh_wire::{
    from_base64, MessageEnvelope, SyncAck, SyncCapabilities, SyncData, SyncDataItem, SyncFrame,
    SyncGet, SyncHello, SyncInv,
};

use crate::error::{Result, SyncError};
use crate::inventory::{build_inventory, select_wants};
use crate::limits::{default_capabilities, DEFAULT_MAX_SYNC_BYTES, PROTOCOL_VERSION};
use crate::signing::{signature_for, verify_frame_signature};

/// Session-level configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Capabilities advertised in our HELLO.
    pub capabilities: SyncCapabilities,
    /// Byte budget we request per session.
    pub max_sync_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capabilities: default_capabilities(),
            max_sync_bytes: DEFAULT_MAX_SYNC_BYTES,
        }
    }
}

/// Where the session stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing sent or received yet.
    Idle,
    /// Our HELLO is out; the peer's has not arrived.
    HelloSent,
    /// Both HELLOs exchanged; legs are running.
    Established,
    /// Both legs finished.
    Complete,
    /// A protocol violation ended the session.
    Aborted,
}

impl SessionPhase {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::HelloSent => "HelloSent",
            Self::Established => "Established",
            Self::Complete => "Complete",
            Self::Aborted => "Aborted",
        }
    }
}

/// The leg where we serve the peer's requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OfferLeg {
    Idle,
    InvSent,
    DataSent,
    Done,
}

/// The leg where we request from the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FetchLeg {
    Idle,
    GetSent,
    Done,
}

/// The verified identity and limits of the connected peer.
#[derive(Clone, Debug)]
struct PeerInfo {
    fp: Fingerprint,
    sign_pk: [u8; 32],
    capabilities: SyncCapabilities,
}

/// What one inbound frame produced.
#[derive(Debug, Default)]
pub struct SessionOutput {
    /// Frames to send to the peer, in order.
    pub frames: Vec<SyncFrame>,
    /// Complete envelopes received in this step (whole or reassembled).
    pub received: Vec<MessageEnvelope>,
}

/// One sync session with one peer.
pub struct SyncSession<'a> {
    sign: &'a SigningKeyPair,
    our_fp: Fingerprint,
    config: SessionConfig,
    phase: SessionPhase,
    offer: OfferLeg,
    fetch: FetchLeg,
    peer: Option<PeerInfo>,
    sent_ids: HashSet<String>,
    acked_ids: Vec<String>,
    collector: ChunkCollector,
}

impl<'a> SyncSession<'a> {
    /// Create a session for our identity.
    pub fn new(sign: &'a SigningKeyPair, config: SessionConfig) -> Self {
        let our_fp = fingerprint(&sign.public_bytes());
        Self {
            sign,
            our_fp,
            config,
            phase: SessionPhase::Idle,
            offer: OfferLeg::Idle,
            fetch: FetchLeg::Idle,
            peer: None,
            sent_ids: HashSet::new(),
            acked_ids: Vec::new(),
            collector: ChunkCollector::new(),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether both legs have finished.
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// The verified peer fingerprint, once the HELLO arrived.
    pub fn peer_fp(&self) -> Option<Fingerprint> {
        self.peer.as_ref().map(|p| p.fp)
    }

    /// Open the session: produce our HELLO.
    pub fn start(&mut self, now_ms: u64) -> Result<SyncFrame> {
        if self.phase != SessionPhase::Idle {
            return Err(SyncError::InvalidFrame("session already started".into()));
        }
        let mut hello = SyncHello {
            v: WIRE_VERSION,
            kind: KIND_HELLO.into(),
            ts: now_ms,
            peer_fp: self.our_fp.to_base64(),
            peer_sign_pk: dmesh_wire::to_base64(&self.sign.public_bytes()),
            capabilities: self.config.capabilities.clone(),
            signature: String::new(),
        };
        hello.signature = signature_for(&hello, self.sign)?;
        self.phase = SessionPhase::HelloSent;
        Ok(SyncFrame::Hello(hello))
    }

    /// Feed one inbound frame; returns frames to send back and any
    /// complete envelopes received.
    ///
    /// # Errors
    ///
    /// Any error aborts the session: subsequent calls fail immediately
    /// and no store state was changed by the offending frame.
    pub fn handle_frame(
        &mut self,
        frame: SyncFrame,
        store: &Store,
        now_ms: u64,
    ) -> Result<SessionOutput> {
        if matches!(self.phase, SessionPhase::Aborted | SessionPhase::Complete) {
            return Err(SyncError::UnexpectedFrame {
                got: frame.kind(),
                phase: self.phase.name(),
            });
        }

        let result = match frame {
            SyncFrame::Hello(hello) => self.on_hello(hello, store, now_ms),
            SyncFrame::Inv(inv) => self.on_inv(inv, store, now_ms),
            SyncFrame::Get(get) => self.on_get(get, store, now_ms),
            SyncFrame::Data(data) => self.on_data(data, now_ms),
            SyncFrame::Ack(ack) => self.on_ack(ack, store, now_ms),
        };

        match result {
            Ok(output) => {
                self.update_phase();
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, "sync session aborted");
                self.phase = SessionPhase::Aborted;
                Err(e)
            }
        }
    }

    fn update_phase(&mut self) {
        if self.phase == SessionPhase::Established
            && self.offer == OfferLeg::Done
            && self.fetch == FetchLeg::Done
        {
            debug!("sync session complete");
            self.phase = SessionPhase::Complete;
        }
    }

    fn peer(&self) -> Result<&PeerInfo> {
        self.peer.as_ref().ok_or(SyncError::UnexpectedFrame {
            got: "non-hello",
            phase: self.phase.name(),
        })
    }

    fn on_hello(
        &mut self,
        hello: SyncHello,
        store: &Store,
        now_ms: u64,
    ) -> Result<SessionOutput> {
        if self.peer.is_some() {
            return Err(SyncError::UnexpectedFrame {
                got: KIND_HELLO,
                phase: self.phase.name(),
            });
        }
        if hello.v != WIRE_VERSION {
            return Err(SyncError::InvalidFrame(format!(
                "unsupported wire version {}",
                hello.v
            )));
        }
        if hello.capabilities.protocol_version != PROTOCOL_VERSION {
            return Err(SyncError::InvalidFrame(format!(
                "unsupported protocol version {}",
                hello.capabilities.protocol_version
            )));
        }

        let pk_bytes = from_base64_exact(&hello.peer_sign_pk, SIGN_PK_LEN)
            .map_err(|e| SyncError::InvalidFrame(e.to_string()))?;
        let mut sign_pk = [0u8; 32];
        sign_pk.copy_from_slice(&pk_bytes);

        // The claimed fingerprint must be the key's fingerprint.
        let claimed = Fingerprint::from_base64(&hello.peer_fp)
            .map_err(|e| SyncError::InvalidFrame(e.to_string()))?;
        let derived = fingerprint(&sign_pk);
        if claimed != derived {
            return Err(SyncError::InvalidFrame(
                "hello fingerprint does not match signing key".into(),
            ));
        }
        if derived == self.our_fp {
            return Err(SyncError::InvalidFrame("refusing to sync with self".into()));
        }

        verify_frame_signature(&hello, &hello.signature, &sign_pk)?;

        debug!(peer = %derived, "peer hello verified");
        self.peer = Some(PeerInfo {
            fp: derived,
            sign_pk,
            capabilities: hello.capabilities,
        });

        let mut output = SessionOutput::default();
        if self.phase == SessionPhase::Idle {
            // Pure responder: our HELLO goes first.
            let our_hello = self.start(now_ms)?;
            output.frames.push(our_hello);
        }
        self.phase = SessionPhase::Established;

        // Open our offer leg with an inventory.
        let peer = self.peer()?.clone();
        let max_items = peer
            .capabilities
            .max_inv_count
            .min(self.config.capabilities.max_inv_count);
        let items = build_inventory(store, &peer.fp, max_items, now_ms)?;
        debug!(count = items.len(), "inventory built");
        let mut inv = SyncInv {
            v: WIRE_VERSION,
            kind: KIND_INV.into(),
            ts: now_ms,
            items,
            signature: String::new(),
        };
        inv.signature = signature_for(&inv, self.sign)?;
        output.frames.push(SyncFrame::Inv(inv));
        self.offer = OfferLeg::InvSent;

        Ok(output)
    }

    fn on_inv(&mut self, inv: SyncInv, store: &Store, now_ms: u64) -> Result<SessionOutput> {
        let peer = self.peer()?.clone();
        if self.fetch != FetchLeg::Idle {
            return Err(SyncError::UnexpectedFrame {
                got: KIND_INV,
                phase: self.phase.name(),
            });
        }
        verify_frame_signature(&inv, &inv.signature, &peer.sign_pk)?;

        if inv.items.len() > self.config.capabilities.max_inv_count {
            return Err(SyncError::LimitExceeded {
                what: "inventory items",
                limit: self.config.capabilities.max_inv_count,
                actual: inv.items.len(),
            });
        }

        let want = select_wants(store, &inv.items, self.config.max_sync_bytes, now_ms)?;
        debug!(offered = inv.items.len(), wanted = want.len(), "wants selected");
        let mut get = SyncGet {
            v: WIRE_VERSION,
            kind: KIND_GET.into(),
            ts: now_ms,
            want,
            max_bytes: self.config.max_sync_bytes,
            signature: String::new(),
        };
        get.signature = signature_for(&get, self.sign)?;
        self.fetch = FetchLeg::GetSent;

        Ok(SessionOutput {
            frames: vec![SyncFrame::Get(get)],
            received: Vec::new(),
        })
    }

    fn on_get(&mut self, get: SyncGet, store: &Store, now_ms: u64) -> Result<SessionOutput> {
        let peer = self.peer()?.clone();
        if self.offer != OfferLeg::InvSent {
            return Err(SyncError::UnexpectedFrame {
                got: KIND_GET,
                phase: self.phase.name(),
            });
        }
        verify_frame_signature(&get, &get.signature, &peer.sign_pk)?;

        let mut items: Vec<SyncDataItem> = Vec::new();
        let mut budget = get.max_bytes;
        let max_items = peer.capabilities.max_chunks;

        for id_b64 in &get.want {
            let Ok(msg_id) = dmesh_crypto::MessageId::from_base64(id_b64) else {
                continue;
            };
            let Some(entry) = store.outbox.get(&msg_id)? else {
                continue;
            };
            if entry.exp < now_ms {
                continue;
            }
            let size = entry.envelope_json.len();
            if size > budget {
                continue;
            }

            let envelope = MessageEnvelope::from_json(&entry.envelope_json)?;
            if size <= peer.capabilities.max_msg_size {
                if items.len() + 1 > max_items {
                    break;
                }
                items.push(SyncDataItem::Message(envelope));
            } else {
                let chunks = dmesh_chunk::chunk(&envelope, peer.capabilities.max_msg_size)?;
                if items.len() + chunks.len() > max_items {
                    // The whole set must fit or the message is useless.
                    continue;
                }
                items.extend(chunks.into_iter().map(SyncDataItem::Chunk));
            }

            budget -= size;
            self.sent_ids.insert(id_b64.clone());
            store.outbox.record_attempt(&msg_id, now_ms)?;
            if entry.status == OutboxStatus::Pending {
                store.outbox.update_status(&msg_id, OutboxStatus::Sent)?;
            }
        }

        debug!(items = items.len(), "data frame built");
        let mut data = SyncData {
            v: WIRE_VERSION,
            kind: KIND_DATA.into(),
            ts: now_ms,
            messages: items,
            signature: String::new(),
        };
        data.signature = signature_for(&data, self.sign)?;
        self.offer = OfferLeg::DataSent;

        Ok(SessionOutput {
            frames: vec![SyncFrame::Data(data)],
            received: Vec::new(),
        })
    }

    fn on_data(&mut self, data: SyncData, now_ms: u64) -> Result<SessionOutput> {
        let peer = self.peer()?.clone();
        let replay = self.fetch == FetchLeg::Done;
        if self.fetch != FetchLeg::GetSent && !replay {
            return Err(SyncError::UnexpectedFrame {
                got: KIND_DATA,
                phase: self.phase.name(),
            });
        }
        verify_frame_signature(&data, &data.signature, &peer.sign_pk)?;

        if data.messages.len() > self.config.capabilities.max_chunks {
            return Err(SyncError::LimitExceeded {
                what: "data items",
                limit: self.config.capabilities.max_chunks,
                actual: data.messages.len(),
            });
        }
        // Budget check with chunking overhead allowed on top.
        let total_bytes: usize = data
            .messages
            .iter()
            .map(|m| match m {
                SyncDataItem::Message(env) => env.to_json().len(),
                SyncDataItem::Chunk(c) => c.data.len(),
            })
            .sum();
        let allowance = self
            .config
            .max_sync_bytes
            .saturating_add(data.messages.len() * CHUNK_OVERHEAD);
        if total_bytes > allowance {
            return Err(SyncError::LimitExceeded {
                what: "data bytes",
                limit: allowance,
                actual: total_bytes,
            });
        }

        let mut received = Vec::new();
        if replay {
            // A re-sent DATA gets a re-sent ACK; nothing is reprocessed.
            debug!("data replay; re-acking");
        } else {
            for item in data.messages {
                match item {
                    SyncDataItem::Message(env) => {
                        if let Some(exp) = env.exp {
                            if exp < now_ms {
                                continue;
                            }
                        }
                        self.acked_ids.push(envelope_msg_id(&env)?);
                        received.push(env);
                    }
                    SyncDataItem::Chunk(chunk) => {
                        if let Some(env) = self.collector.add(chunk, now_ms)? {
                            if let Some(exp) = env.exp {
                                if exp < now_ms {
                                    continue;
                                }
                            }
                            self.acked_ids.push(envelope_msg_id(&env)?);
                            received.push(env);
                        }
                    }
                }
            }
        }

        let mut ack = SyncAck {
            v: WIRE_VERSION,
            kind: KIND_ACK.into(),
            ts: now_ms,
            received: self.acked_ids.clone(),
            signature: String::new(),
        };
        ack.signature = signature_for(&ack, self.sign)?;
        self.fetch = FetchLeg::Done;

        Ok(SessionOutput {
            frames: vec![SyncFrame::Ack(ack)],
            received,
        })
    }

    fn on_ack(&mut self, ack: SyncAck, store: &Store, now_ms: u64) -> Result<SessionOutput> {
        let peer = self.peer()?.clone();
        let replay = self.offer == OfferLeg::Done;
        if self.offer != OfferLeg::DataSent && !replay {
            return Err(SyncError::UnexpectedFrame {
                got: KIND_ACK,
                phase: self.phase.name(),
            });
        }
        verify_frame_signature(&ack, &ack.signature, &peer.sign_pk)?;

        for id_b64 in &ack.received {
            // Only messages we actually sent this session count.
            if !self.sent_ids.contains(id_b64) {
                continue;
            }
            let Ok(msg_id) = dmesh_crypto::MessageId::from_base64(id_b64) else {
                continue;
            };
            store.forwarded.mark_forwarded(&peer.fp, &msg_id, now_ms)?;
            if let Some(entry) = store.outbox.get(&msg_id)? {
                if entry.recipient_fp == Some(peer.fp) {
                    store.outbox.update_status(&msg_id, OutboxStatus::Delivered)?;
                }
            }
        }
        debug!(acked = ack.received.len(), "ack processed");
        self.offer = OfferLeg::Done;

        Ok(SessionOutput::default())
    }
}

/// The message id an envelope should be acknowledged under.
fn envelope_msg_id(env: &MessageEnvelope) -> Result<String> {
    if let Some(id) = &env.msg_id {
        return Ok(id.clone());
    }
    let ciphertext = from_base64(&env.ciphertext)?;
    Ok(dmesh_crypto::message_id(&ciphertext).to_base64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmesh_crypto::{encrypt, BoxKeyPair, EncryptOptions};
    use dmesh_store::OutboxEntry;

    const NOW: u64 = 1_706_012_345_678;

    struct Node {
        sign: SigningKeyPair,
        boxk: BoxKeyPair,
        store: Store,
    }

    impl Node {
        fn new() -> Self {
            Self {
                sign: SigningKeyPair::generate(),
                boxk: BoxKeyPair::generate(),
                store: Store::open_temporary().unwrap(),
            }
        }

        fn fp(&self) -> Fingerprint {
            fingerprint(&self.sign.public_bytes())
        }

        fn queue_message(&self, recipient: &Node, content: &str) -> dmesh_crypto::MessageId {
            let env = encrypt(
                content,
                &self.sign,
                &self.boxk,
                &recipient.boxk.public_bytes(),
                EncryptOptions {
                    ts: Some(NOW),
                    ..Default::default()
                },
            )
            .unwrap();
            let msg_id =
                dmesh_crypto::MessageId::from_base64(env.msg_id.as_ref().unwrap()).unwrap();
            self.store
                .outbox
                .add(&OutboxEntry {
                    msg_id,
                    recipient_fp: Some(recipient.fp()),
                    sender_fp: Some(self.fp()),
                    envelope_json: env.to_json(),
                    exp: env.exp.unwrap(),
                    payload_type: Some("text".into()),
                    urgency: None,
                    created_at: NOW,
                    status: dmesh_store::OutboxStatus::Pending,
                    attempts: 0,
                    last_attempt: None,
                })
                .unwrap();
            msg_id
        }
    }

    /// Pump frames between two sessions until both complete.
    fn run_to_completion(
        alice: &Node,
        bob: &Node,
        a_session: &mut SyncSession<'_>,
        b_session: &mut SyncSession<'_>,
    ) -> (Vec<MessageEnvelope>, Vec<MessageEnvelope>) {
        let mut a_inbox = Vec::new();
        let mut b_inbox = Vec::new();
        let mut to_b = vec![a_session.start(NOW).unwrap()];
        let mut to_a = vec![b_session.start(NOW).unwrap()];

        for _ in 0..16 {
            if to_a.is_empty() && to_b.is_empty() {
                break;
            }
            let mut next_to_a = Vec::new();
            let mut next_to_b = Vec::new();
            for frame in to_b.drain(..) {
                let out = b_session.handle_frame(frame, &bob.store, NOW).unwrap();
                b_inbox.extend(out.received);
                next_to_a.extend(out.frames);
            }
            for frame in to_a.drain(..) {
                let out = a_session.handle_frame(frame, &alice.store, NOW).unwrap();
                a_inbox.extend(out.received);
                next_to_b.extend(out.frames);
            }
            to_a = next_to_a;
            to_b = next_to_b;
        }

        assert!(a_session.is_complete(), "alice session incomplete");
        assert!(b_session.is_complete(), "bob session incomplete");
        (a_inbox, b_inbox)
    }

    #[test]
    fn test_full_exchange_delivers_pending_messages() {
        let alice = Node::new();
        let bob = Node::new();
        let msg_id = alice.queue_message(&bob, "hello bob");

        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b_session = SyncSession::new(&bob.sign, SessionConfig::default());
        let (a_received, b_received) = run_to_completion(&alice, &bob, &mut a_session, &mut b_session);

        assert!(a_received.is_empty());
        assert_eq!(b_received.len(), 1);
        assert_eq!(
            b_received[0].msg_id.as_deref(),
            Some(msg_id.to_base64().as_str())
        );

        // Alice recorded the forwarding receipt and delivery.
        assert!(alice
            .store
            .forwarded
            .was_forwarded(&bob.fp(), &msg_id)
            .unwrap());
        let entry = alice.store.outbox.get(&msg_id).unwrap().unwrap();
        assert_eq!(entry.status, dmesh_store::OutboxStatus::Delivered);
        assert_eq!(entry.attempts, 1);
    }

    #[test]
    fn test_second_session_suppresses_forwarded() {
        let alice = Node::new();
        let bob = Node::new();
        alice.queue_message(&bob, "hello once");

        let mut a1 = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b1 = SyncSession::new(&bob.sign, SessionConfig::default());
        let (_, b_received) = run_to_completion(&alice, &bob, &mut a1, &mut b1);
        assert_eq!(b_received.len(), 1);

        // A second session offers nothing: the INV suppression test.
        let mut a2 = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b2 = SyncSession::new(&bob.sign, SessionConfig::default());
        let (_, b_received_again) = run_to_completion(&alice, &bob, &mut a2, &mut b2);
        assert!(b_received_again.is_empty());
    }

    #[test]
    fn test_oversized_message_is_chunked_in_data() {
        let alice = Node::new();
        let bob = Node::new();
        alice.queue_message(&bob, &"L".repeat(8 * 1024));

        // Bob only accepts tiny unchunked messages.
        let mut small_caps = SessionConfig::default();
        small_caps.capabilities.max_msg_size = 2048;

        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b_session = SyncSession::new(&bob.sign, small_caps);
        let (_, b_received) = run_to_completion(&alice, &bob, &mut a_session, &mut b_session);

        // Reassembled transparently from chunks.
        assert_eq!(b_received.len(), 1);
    }

    #[test]
    fn test_bad_hello_fingerprint_aborts() {
        let alice = Node::new();
        let mallory = Node::new();
        let mut session = SyncSession::new(&alice.sign, SessionConfig::default());
        session.start(NOW).unwrap();

        let mut hello_session = SyncSession::new(&mallory.sign, SessionConfig::default());
        let SyncFrame::Hello(mut hello) = hello_session.start(NOW).unwrap() else {
            panic!("not a hello");
        };
        // Claim someone else's fingerprint.
        hello.peer_fp = fingerprint(&[42; 32]).to_base64();

        let err = session
            .handle_frame(SyncFrame::Hello(hello), &alice.store, NOW)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidMessageFormat");
        assert_eq!(session.phase(), SessionPhase::Aborted);
    }

    #[test]
    fn test_tampered_frame_signature_aborts() {
        let alice = Node::new();
        let bob = Node::new();
        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        a_session.start(NOW).unwrap();

        let mut b_session = SyncSession::new(&bob.sign, SessionConfig::default());
        let SyncFrame::Hello(mut hello) = b_session.start(NOW).unwrap() else {
            panic!("not a hello");
        };
        hello.ts += 1; // invalidates the signature

        let err = a_session
            .handle_frame(SyncFrame::Hello(hello), &alice.store, NOW)
            .unwrap_err();
        assert_eq!(err.code(), "SignatureInvalid");
    }

    #[test]
    fn test_out_of_order_frame_aborts() {
        let alice = Node::new();
        let bob = Node::new();
        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        a_session.start(NOW).unwrap();

        // An INV before any HELLO.
        let mut inv = SyncInv {
            v: 1,
            kind: KIND_INV.into(),
            ts: NOW,
            items: Vec::new(),
            signature: String::new(),
        };
        inv.signature = signature_for(&inv, &bob.sign).unwrap();

        let err = a_session
            .handle_frame(SyncFrame::Inv(inv), &alice.store, NOW)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidMessageFormat");
        assert_eq!(a_session.phase(), SessionPhase::Aborted);

        // Aborted sessions refuse everything.
        let mut hello_session = SyncSession::new(&bob.sign, SessionConfig::default());
        let hello = hello_session.start(NOW).unwrap();
        assert!(a_session.handle_frame(hello, &alice.store, NOW).is_err());
    }

    #[test]
    fn test_inventory_limit_enforced() {
        let alice = Node::new();
        let bob = Node::new();

        let mut tight = SessionConfig::default();
        tight.capabilities.max_inv_count = 1;
        let mut a_session = SyncSession::new(&alice.sign, tight);
        a_session.start(NOW).unwrap();

        let mut b_session = SyncSession::new(&bob.sign, SessionConfig::default());
        let b_hello = b_session.start(NOW).unwrap();
        a_session.handle_frame(b_hello, &alice.store, NOW).unwrap();

        // Two items exceeds alice's advertised cap of one.
        let items = (0..2)
            .map(|i| dmesh_wire::SyncInvItem {
                msg_id: dmesh_crypto::message_id(&[i]).to_base64(),
                exp: NOW + 1000,
                size: 10,
                priority: 1,
            })
            .collect();
        let mut inv = SyncInv {
            v: 1,
            kind: KIND_INV.into(),
            ts: NOW,
            items,
            signature: String::new(),
        };
        inv.signature = signature_for(&inv, &bob.sign).unwrap();

        let err = a_session
            .handle_frame(SyncFrame::Inv(inv), &alice.store, NOW)
            .unwrap_err();
        assert_eq!(err.code(), "ContentTooLarge");
    }

    #[test]
    fn test_self_sync_refused() {
        let alice = Node::new();
        let mut session = SyncSession::new(&alice.sign, SessionConfig::default());
        session.start(NOW).unwrap();

        let mut other = SyncSession::new(&alice.sign, SessionConfig::default());
        let hello = other.start(NOW).unwrap();
        let err = session.handle_frame(hello, &alice.store, NOW).unwrap_err();
        assert_eq!(err.code(), "InvalidMessageFormat");
    }

    #[test]
    fn test_expired_outbox_entries_not_offered() {
        let alice = Node::new();
        let bob = Node::new();
        let msg_id = alice.queue_message(&bob, "already stale");
        // Force the entry to be expired.
        let mut entry = alice.store.outbox.get(&msg_id).unwrap().unwrap();
        entry.exp = NOW - 1;
        alice.store.outbox.remove(&msg_id).unwrap();
        alice.store.outbox.add(&entry).unwrap();

        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b_session = SyncSession::new(&bob.sign, SessionConfig::default());
        let (_, b_received) = run_to_completion(&alice, &bob, &mut a_session, &mut b_session);
        assert!(b_received.is_empty());
    }

    #[test]
    fn test_ack_for_unsent_id_is_ignored() {
        let alice = Node::new();
        let bob = Node::new();
        alice.queue_message(&bob, "real message");

        let mut a_session = SyncSession::new(&alice.sign, SessionConfig::default());
        let mut b_session = SyncSession::new(&bob.sign, SessionConfig::default());
        run_to_completion(&alice, &bob, &mut a_session, &mut b_session);

        // Nothing alice never sent can appear in her forwarded set.
        let phantom = dmesh_crypto::message_id(b"phantom");
        assert!(!alice
            .store
            .forwarded
            .was_forwarded(&bob.fp(), &phantom)
            .unwrap());
    }
}
