//! Frame signing and verification.
//!
//! A frame's signature covers its canonical JSON with the signature
//! field blank (see [`dmesh_wire::frames::frame_signing_text`]).

use serde::Serialize;

use dmesh_crypto::keys::verify_detached;
use dmesh_crypto::SigningKeyPair;
use dmesh_wire::frames::frame_signing_text;
use dmesh_wire::limits::SIGNATURE_LEN;
use dmesh_wire::{encoding::from_base64_exact, to_base64};

use crate::error::{Result, SyncError};

/// Compute the base64 signature for a frame.
///
/// The frame's current signature field is ignored (the canonical text
/// blanks it), so this can be called on a frame under construction.
pub fn signature_for<T: Serialize>(frame: &T, sign: &SigningKeyPair) -> Result<String> {
    let text = frame_signing_text(frame)?;
    Ok(to_base64(&sign.sign(text.as_bytes())))
}

/// Verify a frame's signature against the claimed signing key.
///
/// # Errors
///
/// `SignatureInvalid` on any decode or verification failure — peers get
/// no detail about which part failed.
pub fn verify_frame_signature<T: Serialize>(
    frame: &T,
    signature_b64: &str,
    peer_sign_pk: &[u8; 32],
) -> Result<()> {
    let text = frame_signing_text(frame).map_err(|_| SyncError::SignatureInvalid)?;
    let sig_bytes =
        from_base64_exact(signature_b64, SIGNATURE_LEN).map_err(|_| SyncError::SignatureInvalid)?;
    let mut signature = [0u8; SIGNATURE_LEN];
    signature.copy_from_slice(&sig_bytes);
    verify_detached(peer_sign_pk, text.as_bytes(), &signature)
        .map_err(|_| SyncError::SignatureInvalid)
}
