//! Envelope sealing.
//!
//! Each message is sealed with NaCl box under a fresh ephemeral X25519
//! key, then signed with the sender's long-term Ed25519 key over the
//! domain-separated signing bytes. The ephemeral secret is destroyed
//! as soon as the box is sealed.

use crypto_box::aead::Aead;
use crypto_box::{Nonce, PublicKey, SalsaBox};
use rand_core::{OsRng, RngCore};
use serde_json::{Map, Value};

use dmesh_wire::envelope::KIND_MESSAGE;
use dmesh_wire::limits::{DEFAULT_TTL_MS, MAX_BYTES, NONCE_LEN, WIRE_VERSION};
use dmesh_wire::{time, to_base64, MessageEnvelope, Payload};

use crate::error::{CryptoError, Result};
use crate::ids::message_id;
use crate::keys::{BoxKeyPair, EphemeralBoxKeyPair, SigningKeyPair};
use crate::sign_bytes::build_sign_bytes;

/// Optional knobs for [`encrypt`]; `Default` gives a plain text message
/// stamped now with the standard 7-day TTL.
#[derive(Clone, Debug, Default)]
pub struct EncryptOptions {
    /// Creation timestamp override (Unix ms); defaults to the clock.
    pub ts: Option<u64>,
    /// Time-to-live override; defaults to `DEFAULT_TTL_MS`.
    pub ttl_ms: Option<u64>,
    /// Payload type tag; defaults to `text`.
    pub payload_type: Option<String>,
    /// Type-specific payload extras (urgency, location, ...).
    pub extra: Option<Map<String, Value>>,
}

/// Encrypt `content` for the holder of `recipient_box_pk`.
///
/// Produces a self-authenticating envelope: any holder of the sender's
/// signing key can verify it, and only the recipient can open it.
///
/// # Errors
///
/// `ContentTooLarge` when the UTF-8 content exceeds `MAX_BYTES`;
/// `DecryptionFailed` if sealing itself fails (an invariant violation
/// with well-formed inputs).
pub fn encrypt(
    content: &str,
    sender_sign: &SigningKeyPair,
    sender_box: &BoxKeyPair,
    recipient_box_pk: &[u8; 32],
    opts: EncryptOptions,
) -> Result<MessageEnvelope> {
    // Step 1: size gate before any crypto work.
    if content.len() > MAX_BYTES {
        return Err(CryptoError::ContentTooLarge {
            max: MAX_BYTES,
            actual: content.len(),
        });
    }

    // Step 2: timestamps.
    let ts = opts.ts.unwrap_or_else(time::now_ms);
    let exp = ts.saturating_add(opts.ttl_ms.unwrap_or(DEFAULT_TTL_MS));

    // Step 3: fresh ephemeral keypair and nonce.
    let ephemeral = EphemeralBoxKeyPair::generate();
    let eph_pk = ephemeral.public_bytes();
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    // Step 4: plaintext payload.
    let payload = Payload::new(ts, opts.payload_type.as_deref(), content, opts.extra);
    let plaintext = payload.to_bytes();

    // Step 5: seal with NaCl box under (recipient_pk, eph_sk, nonce).
    let recipient_pk = PublicKey::from(*recipient_box_pk);
    let eph_secret = ephemeral.into_secret();
    let sealing_box = SalsaBox::new(&recipient_pk, &eph_secret);
    let ciphertext = sealing_box
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    // Step 8 (of the protocol): the ephemeral secret is zeroized here.
    drop(sealing_box);
    drop(eph_secret);

    // Step 6: message id binds the envelope to this exact ciphertext.
    let msg_id = message_id(&ciphertext);

    // Step 7: detached signature over the domain-separated bytes.
    let sender_sign_pk = sender_sign.public_bytes();
    let sender_box_pk = sender_box.public_bytes();
    let sign_input = build_sign_bytes(
        &sender_sign_pk,
        &sender_box_pk,
        recipient_box_pk,
        &eph_pk,
        &nonce,
        ts,
        &ciphertext,
    );
    let signature = sender_sign.sign(&sign_input);

    // Step 9: assemble the wire envelope.
    Ok(MessageEnvelope {
        v: WIRE_VERSION,
        kind: KIND_MESSAGE.into(),
        msg_id: Some(msg_id.to_base64()),
        ts,
        exp: Some(exp),
        sender_sign_pk: to_base64(&sender_sign_pk),
        sender_box_pk: to_base64(&sender_box_pk),
        recipient_box_pk: to_base64(recipient_box_pk),
        eph_pk: to_base64(&eph_pk),
        nonce: to_base64(&nonce),
        ciphertext: to_base64(&ciphertext),
        signature: to_base64(&signature),
    })
}
