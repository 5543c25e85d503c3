//! Envelope opening — the fixed-order validation state machine.
//!
//! The ten checks run in a mandatory order and the first failure is
//! returned. The order carries the protocol's security properties:
//! recipient binding precedes the signature check so envelopes destined
//! elsewhere never cost cryptographic work, and the replay check follows
//! the signature so forged replays cannot pollute the seen-set.
//!
//! Two validity modes coexist: `Strict` (v1.0 clock-skew window) and
//! `DelayTolerant` (v1.1 expiration-based, the store-and-forward
//! default).

use crypto_box::aead::Aead;
use crypto_box::{Nonce, PublicKey, SalsaBox};
use subtle::ConstantTimeEq;

use dmesh_wire::encoding::from_base64_exact;
use dmesh_wire::limits::{
    BOX_PK_LEN, DEFAULT_TTL_MS, MAX_SKEW_MS, NONCE_LEN, SIGNATURE_LEN, SIGN_PK_LEN,
};
use dmesh_wire::{from_base64, MessageEnvelope, Payload};

use crate::error::{CryptoError, Result};
use crate::ids::{fingerprint, message_id, Fingerprint, MessageId};
use crate::keys::{verify_detached, BoxKeyPair};
use crate::sign_bytes::build_sign_bytes;

/// How the validity window is judged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidityMode {
    /// v1.0: the timestamp must be within `MAX_SKEW_MS` of local time.
    Strict,
    /// v1.1: the message is valid until its expiration time.
    #[default]
    DelayTolerant,
}

/// Outcome of a replay guard's atomic check-and-mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayVerdict {
    /// First sighting; the pair is now marked seen.
    Allowed,
    /// The pair was already in the seen-set; nothing was written.
    Rejected,
}

/// Deduplication hook consulted between signature verification and box
/// opening.
///
/// `check_and_mark` must be atomic: for a given `(msg_id, sender_fp)`
/// pair, concurrent calls yield exactly one `Allowed`.
pub trait ReplayGuard {
    /// Atomically test-and-mark the pair; `Allowed` exactly once.
    fn check_and_mark(&self, msg_id: &MessageId, sender_fp: &Fingerprint)
        -> Result<ReplayVerdict>;
}

/// Optional inputs to [`decrypt`]; `Default` is delay-tolerant TOFU with
/// no replay guard.
#[derive(Default)]
pub struct DecryptOptions<'a> {
    /// Validity window mode.
    pub mode: ValidityMode,
    /// Pinned sender signing key; mismatch is `SenderKeyMismatch`.
    pub expected_sender_sign_pk: Option<[u8; 32]>,
    /// Pinned sender box key; mismatch is `SenderKeyMismatch`.
    pub expected_sender_box_pk: Option<[u8; 32]>,
    /// Deduplication hook; `None` skips the replay check.
    pub replay: Option<&'a dyn ReplayGuard>,
    /// Clock override for deterministic tests; defaults to now.
    pub now_ms: Option<u64>,
}

/// A successfully opened and verified message.
///
/// Carries the observed sender keys and fingerprint so a caller doing
/// trust-on-first-use can decide whether to persist a new contact.
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessage {
    /// The decrypted content string.
    pub content: String,
    /// Payload type tag (`text`, `need_help`, ...).
    pub payload_type: String,
    /// The full payload, including type-specific extras.
    pub payload: Payload,
    /// Envelope timestamp (Unix ms).
    pub ts: u64,
    /// Message id recomputed from the ciphertext.
    pub msg_id: MessageId,
    /// Observed sender signing key.
    pub sender_sign_pk: [u8; 32],
    /// Observed sender box key.
    pub sender_box_pk: [u8; 32],
    /// Fingerprint of the observed signing key.
    pub sender_fp: Fingerprint,
}

fn to_array<const N: usize>(bytes: Vec<u8>) -> [u8; N] {
    // Length is enforced by from_base64_exact before this runs.
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    arr
}

struct DecodedFields {
    sender_sign_pk: [u8; 32],
    sender_box_pk: [u8; 32],
    recipient_box_pk: [u8; 32],
    eph_pk: [u8; 32],
    nonce: [u8; NONCE_LEN],
    signature: [u8; SIGNATURE_LEN],
    ciphertext: Vec<u8>,
}

fn decode_fields(env: &MessageEnvelope) -> Result<DecodedFields> {
    Ok(DecodedFields {
        sender_sign_pk: to_array(from_base64_exact(&env.sender_sign_pk, SIGN_PK_LEN)?),
        sender_box_pk: to_array(from_base64_exact(&env.sender_box_pk, BOX_PK_LEN)?),
        recipient_box_pk: to_array(from_base64_exact(&env.recipient_box_pk, BOX_PK_LEN)?),
        eph_pk: to_array(from_base64_exact(&env.eph_pk, BOX_PK_LEN)?),
        nonce: to_array(from_base64_exact(&env.nonce, NONCE_LEN)?),
        signature: to_array(from_base64_exact(&env.signature, SIGNATURE_LEN)?),
        ciphertext: from_base64(&env.ciphertext)?,
    })
}

fn check_validity_window(env: &MessageEnvelope, mode: ValidityMode, now: u64) -> Result<u64> {
    match mode {
        ValidityMode::Strict => {
            if now.abs_diff(env.ts) > MAX_SKEW_MS {
                return Err(CryptoError::TimestampSkew { ts: env.ts, now });
            }
            Ok(env.ts.saturating_add(DEFAULT_TTL_MS))
        }
        ValidityMode::DelayTolerant => {
            let exp = env.exp.unwrap_or_else(|| env.ts.saturating_add(DEFAULT_TTL_MS));
            if now > exp {
                return Err(CryptoError::MessageExpired { exp, now });
            }
            Ok(exp)
        }
    }
}

/// The authenticated surface of an envelope, without opening it.
#[derive(Clone, Debug)]
pub struct VerifiedEnvelope {
    /// Message id recomputed from the ciphertext.
    pub msg_id: MessageId,
    /// Fingerprint of the observed signing key.
    pub sender_fp: Fingerprint,
    /// Observed sender signing key.
    pub sender_sign_pk: [u8; 32],
    /// Observed sender box key.
    pub sender_box_pk: [u8; 32],
    /// The recipient the envelope is bound to.
    pub recipient_box_pk: [u8; 32],
    /// Effective expiration time (declared, or ts plus the default TTL).
    pub exp: u64,
}

/// Verify an envelope's authenticity without being its recipient.
///
/// Runs the format, decode, validity, message-id, and signature checks
/// of the decrypt pipeline — everything that needs only public data.
/// Store-and-forward relays use this to refuse to carry forgeries.
///
/// # Errors
///
/// The error of the first failing check, as in [`decrypt`].
pub fn verify_envelope(
    env: &MessageEnvelope,
    mode: ValidityMode,
    now_ms: Option<u64>,
) -> Result<VerifiedEnvelope> {
    env.check_header()?;
    let fields = decode_fields(env)?;

    let now = now_ms.unwrap_or_else(dmesh_wire::time::now_ms);
    let exp = check_validity_window(env, mode, now)?;

    let msg_id = message_id(&fields.ciphertext);
    if let Some(declared) = &env.msg_id {
        let declared = MessageId::from_base64(declared)?;
        if declared != msg_id {
            return Err(CryptoError::MessageIdMismatch);
        }
    }

    let sign_input = build_sign_bytes(
        &fields.sender_sign_pk,
        &fields.sender_box_pk,
        &fields.recipient_box_pk,
        &fields.eph_pk,
        &fields.nonce,
        env.ts,
        &fields.ciphertext,
    );
    verify_detached(&fields.sender_sign_pk, &sign_input, &fields.signature)?;

    Ok(VerifiedEnvelope {
        msg_id,
        sender_fp: fingerprint(&fields.sender_sign_pk),
        sender_sign_pk: fields.sender_sign_pk,
        sender_box_pk: fields.sender_box_pk,
        recipient_box_pk: fields.recipient_box_pk,
        exp,
    })
}

/// Open and verify an envelope addressed to `recipient_box`.
///
/// Validation order (mandatory):
///
/// 1. format tags
/// 2. base64 decode and fixed lengths
/// 3. validity window (per [`ValidityMode`])
/// 4. message-id binding
/// 5. recipient binding
/// 6. sender key continuity against pinned expectations
/// 7. Ed25519 signature over the signing bytes
/// 8. replay check-and-mark
/// 9. box open
/// 10. payload parse
///
/// # Errors
///
/// The error of the first failing check; see [`CryptoError`]. No state
/// is written on failure — `ReplayDetected` in particular leaves the
/// seen-set untouched (the pair was already present).
pub fn decrypt(
    env: &MessageEnvelope,
    recipient_box: &BoxKeyPair,
    opts: DecryptOptions<'_>,
) -> Result<DecryptedMessage> {
    // 1. Format.
    env.check_header()?;

    // 2. Decode and length-check every byte field.
    let fields = decode_fields(env)?;

    // 3. Validity window.
    let now = opts.now_ms.unwrap_or_else(dmesh_wire::time::now_ms);
    check_validity_window(env, opts.mode, now)?;

    // 4. Message-id binding (when the envelope declares one).
    let msg_id = message_id(&fields.ciphertext);
    if let Some(declared) = &env.msg_id {
        let declared = MessageId::from_base64(declared)?;
        if declared != msg_id {
            return Err(CryptoError::MessageIdMismatch);
        }
    }

    // 5. Recipient binding, before any signature work.
    let our_box_pk = recipient_box.public_bytes();
    if !bool::from(fields.recipient_box_pk.ct_eq(&our_box_pk)) {
        return Err(CryptoError::RecipientMismatch);
    }

    // 6. Sender identity continuity.
    let sender_fp = fingerprint(&fields.sender_sign_pk);
    if let Some(expected) = opts.expected_sender_sign_pk {
        if !bool::from(expected.ct_eq(&fields.sender_sign_pk)) {
            return Err(CryptoError::SenderKeyMismatch);
        }
    }
    if let Some(expected) = opts.expected_sender_box_pk {
        if !bool::from(expected.ct_eq(&fields.sender_box_pk)) {
            return Err(CryptoError::SenderKeyMismatch);
        }
    }

    // 7. Signature over the domain-separated bytes.
    let sign_input = build_sign_bytes(
        &fields.sender_sign_pk,
        &fields.sender_box_pk,
        &fields.recipient_box_pk,
        &fields.eph_pk,
        &fields.nonce,
        env.ts,
        &fields.ciphertext,
    );
    verify_detached(&fields.sender_sign_pk, &sign_input, &fields.signature)?;

    // 8. Replay check, only after the signature proves origin.
    if let Some(guard) = opts.replay {
        match guard.check_and_mark(&msg_id, &sender_fp)? {
            ReplayVerdict::Allowed => {}
            ReplayVerdict::Rejected => return Err(CryptoError::ReplayDetected),
        }
    }

    // 9. Open the box.
    let opening_box = SalsaBox::new(&PublicKey::from(fields.eph_pk), recipient_box.secret());
    let plaintext = opening_box
        .decrypt(Nonce::from_slice(&fields.nonce), fields.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    // 10. Parse the payload.
    let payload = Payload::from_bytes(&plaintext)?;

    Ok(DecryptedMessage {
        content: payload.content.clone(),
        payload_type: payload.payload_type.clone(),
        ts: env.ts,
        msg_id,
        sender_sign_pk: fields.sender_sign_pk,
        sender_box_pk: fields.sender_box_pk,
        sender_fp,
        payload,
    })
}
