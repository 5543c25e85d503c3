//! The session driver.
//!
//! [`SyncEngine`] runs a [`SyncSession`](crate::SyncSession) over any
//! [`FrameChannel`], pumping frames until the session completes, the
//! channel goes quiet, or the caller cancels. The engine owns the
//! anti-DoS pieces the state machine cannot see: per-peer session rate
//! limits and the idle timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use dmesh_crypto::{Fingerprint, SigningKeyPair};
use dmesh_store::Store;
use dmesh_transport::{FrameChannel, TransportError};
use dmesh_wire::time::now_ms;
use dmesh_wire::{MessageEnvelope, SyncFrame};

use crate::error::{Result, SyncError};
use crate::limits::DEFAULT_SESSIONS_PER_MINUTE;
use crate::rate_limit::SessionRateLimiter;
use crate::session::{SessionConfig, SyncSession};

/// Cooperative cancellation flag.
///
/// Checked at every frame boundary; a cancelled session stops before
/// its next store write, and single-tree atomicity means no partial
/// state is left behind.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Per-session limits and capability advertisement.
    pub session: SessionConfig,
    /// Sessions accepted from one peer per minute.
    pub sessions_per_minute: usize,
    /// Sleep between empty channel polls.
    pub idle_poll: Duration,
    /// Consecutive empty polls before the session times out.
    pub max_idle_polls: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            sessions_per_minute: DEFAULT_SESSIONS_PER_MINUTE,
            idle_poll: Duration::from_millis(5),
            max_idle_polls: 2000,
        }
    }
}

/// What a completed session accomplished.
#[derive(Debug)]
pub struct SessionReport {
    /// The verified peer.
    pub peer_fp: Option<Fingerprint>,
    /// Complete envelopes received (whole or reassembled); the caller
    /// decides what to decrypt, store, or re-queue for forwarding.
    pub received: Vec<MessageEnvelope>,
    /// Frames processed before completion.
    pub frames_processed: usize,
}

/// Drives sync sessions for one node.
pub struct SyncEngine<'a> {
    store: &'a Store,
    sign: &'a SigningKeyPair,
    config: SyncConfig,
    limiter: SessionRateLimiter,
}

impl<'a> SyncEngine<'a> {
    /// Create an engine over a node's store and signing identity.
    pub fn new(store: &'a Store, sign: &'a SigningKeyPair, config: SyncConfig) -> Self {
        let limiter =
            SessionRateLimiter::with_limits(crate::limits::RATE_WINDOW_MS, config.sessions_per_minute);
        Self {
            store,
            sign,
            config,
            limiter,
        }
    }

    /// Run one full session over a channel.
    ///
    /// Sends our HELLO immediately, then pumps inbound frames through
    /// the state machine until completion. Transport errors and
    /// cancellation abort with no forwarded-set writes beyond those
    /// already justified by a signed ACK.
    pub fn run_session(
        &mut self,
        channel: &mut dyn FrameChannel,
        cancel: &CancelToken,
    ) -> Result<SessionReport> {
        let mut session = SyncSession::new(self.sign, self.config.session.clone());
        let hello = session.start(now_ms())?;
        channel.send(&hello.to_json())?;

        let mut received = Vec::new();
        let mut frames_processed = 0usize;
        let mut idle_polls = 0usize;
        let mut rate_checked = false;

        while !session.is_complete() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let Some(text) = channel.recv()? else {
                idle_polls += 1;
                if idle_polls >= self.config.max_idle_polls {
                    return Err(SyncError::Transport(TransportError::Io(
                        "sync channel idle timeout".into(),
                    )));
                }
                std::thread::sleep(self.config.idle_poll);
                continue;
            };
            idle_polls = 0;

            let frame = SyncFrame::parse(&text)?;
            debug!(kind = frame.kind(), "frame received");
            let output = session.handle_frame(frame, self.store, now_ms())?;
            frames_processed += 1;

            if !rate_checked {
                if let Some(peer_fp) = session.peer_fp() {
                    rate_checked = true;
                    if !self.limiter.allow_session(&peer_fp, now_ms()) {
                        return Err(SyncError::RateLimited {
                            peer: peer_fp.to_hex(),
                        });
                    }
                }
            }

            for frame in output.frames {
                channel.send(&frame.to_json())?;
            }
            received.extend(output.received);
        }

        let peer_fp = session.peer_fp();
        info!(
            peer = ?peer_fp,
            received = received.len(),
            frames = frames_processed,
            "sync session complete"
        );
        Ok(SessionReport {
            peer_fp,
            received,
            frames_processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmesh_crypto::{encrypt, fingerprint, BoxKeyPair, EncryptOptions};
    use dmesh_store::{OutboxEntry, OutboxStatus};
    use dmesh_transport::PairedChannel;

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

        fn queue_message(&self, recipient_box_pk: &[u8; 32], recipient_fp: Fingerprint) {
            let env = encrypt(
                "engine test",
                &self.sign,
                &self.boxk,
                recipient_box_pk,
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
                    recipient_fp: Some(recipient_fp),
                    sender_fp: Some(fingerprint(&self.sign.public_bytes())),
                    envelope_json: env.to_json(),
                    exp: env.exp.unwrap(),
                    payload_type: Some("text".into()),
                    urgency: None,
                    created_at: NOW,
                    status: OutboxStatus::Pending,
                    attempts: 0,
                    last_attempt: None,
                })
                .unwrap();
        }
    }

    #[test]
    fn test_two_engines_sync_over_paired_channel() {
        let alice = Node::new();
        let bob = Node::new();
        let bob_fp = fingerprint(&bob.sign.public_bytes());
        alice.queue_message(&bob.boxk.public_bytes(), bob_fp);

        let (mut chan_a, mut chan_b) = PairedChannel::pair();
        let cancel = CancelToken::new();

        std::thread::scope(|scope| {
            let a_handle = scope.spawn(|| {
                let mut engine =
                    SyncEngine::new(&alice.store, &alice.sign, SyncConfig::default());
                engine.run_session(&mut chan_a, &cancel).unwrap()
            });
            let b_handle = scope.spawn(|| {
                let mut engine = SyncEngine::new(&bob.store, &bob.sign, SyncConfig::default());
                engine.run_session(&mut chan_b, &cancel).unwrap()
            });

            let a_report = a_handle.join().unwrap();
            let b_report = b_handle.join().unwrap();

            assert_eq!(a_report.received.len(), 0);
            assert_eq!(b_report.received.len(), 1);
            assert_eq!(
                a_report.peer_fp,
                Some(fingerprint(&bob.sign.public_bytes()))
            );
        });
    }

    #[test]
    fn test_cancellation_stops_session() {
        let alice = Node::new();
        let (mut chan, _other) = PairedChannel::pair();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut engine = SyncEngine::new(&alice.store, &alice.sign, SyncConfig::default());
        let err = engine.run_session(&mut chan, &cancel).unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
    }

    #[test]
    fn test_idle_channel_times_out() {
        let alice = Node::new();
        let (mut chan, _other) = PairedChannel::pair();
        let cancel = CancelToken::new();

        let config = SyncConfig {
            idle_poll: Duration::from_millis(1),
            max_idle_polls: 3,
            ..Default::default()
        };
        let mut engine = SyncEngine::new(&alice.store, &alice.sign, config);
        let err = engine.run_session(&mut chan, &cancel).unwrap_err();
        assert_eq!(err.code(), "TransportError");
    }

    #[test]
    fn test_rate_limit_rejects_chatty_peer() {
        let alice = Node::new();
        let bob = Node::new();
        let cancel = CancelToken::new();

        let config = SyncConfig {
            sessions_per_minute: 1,
            ..Default::default()
        };
        let mut a_engine = SyncEngine::new(&alice.store, &alice.sign, config);

        let bob_config = SyncConfig {
            idle_poll: Duration::from_millis(1),
            max_idle_polls: 500,
            ..Default::default()
        };

        // First session succeeds.
        std::thread::scope(|scope| {
            let (mut chan_a, mut chan_b) = PairedChannel::pair();
            let first_config = bob_config.clone();
            let a_engine_ref = &mut a_engine;
            let cancel_a = cancel.clone();
            let cancel_b = cancel.clone();
            let bob_store = &bob.store;
            let bob_sign = &bob.sign;
            let a = scope.spawn(move || a_engine_ref.run_session(&mut chan_a, &cancel_a));
            let b = scope.spawn(move || {
                let mut b_engine = SyncEngine::new(bob_store, bob_sign, first_config);
                b_engine.run_session(&mut chan_b, &cancel_b)
            });
            assert!(a.join().unwrap().is_ok());
            assert!(b.join().unwrap().is_ok());
        });

        // Second session from the same peer inside the window is refused.
        std::thread::scope(|scope| {
            let (mut chan_a2, mut chan_b2) = PairedChannel::pair();
            let a_engine_ref = &mut a_engine;
            let cancel_a2 = cancel.clone();
            let cancel_b2 = cancel.clone();
            let bob_store = &bob.store;
            let bob_sign = &bob.sign;
            let a2 = scope.spawn(move || a_engine_ref.run_session(&mut chan_a2, &cancel_a2));
            let b2 = scope.spawn(move || {
                let mut b_engine = SyncEngine::new(bob_store, bob_sign, bob_config);
                b_engine.run_session(&mut chan_b2, &cancel_b2)
            });
            let a2_result = a2.join().unwrap();
            assert!(matches!(a2_result, Err(SyncError::RateLimited { .. })));
            // Bob's side times out once alice stops responding.
            let _ = b2.join().unwrap();
        });
    }
}
