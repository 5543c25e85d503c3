//! The domain-separated signing-byte construction.
//!
//! The exact byte string a sender signs and a receiver reconstructs.
//! Field order, lengths, and endianness are frozen; any change is a
//! breaking protocol change.
//!
//! ```text
//! DOMAIN            12 B
//! sender_sign_pk    32 B
//! sender_box_pk     32 B
//! recipient_box_pk  32 B
//! eph_pk            32 B
//! nonce             24 B
//! u64be(ts)          8 B
//! u32be(|ct|)        4 B
//! ciphertext        variable
//! ```
//!
//! Binding the recipient's box key prevents re-targeting a valid
//! envelope; binding the ciphertext length prevents extension splices.

use dmesh_wire::limits::{DOMAIN, NONCE_LEN};
use dmesh_wire::{concat, u32be, u64be};

/// Fixed prefix length before the ciphertext.
pub const SIGN_BYTES_PREFIX_LEN: usize = 12 + 32 * 4 + NONCE_LEN + 8 + 4;

/// Build the signing bytes for an envelope.
#[allow(clippy::too_many_arguments)]
pub fn build_sign_bytes(
    sender_sign_pk: &[u8; 32],
    sender_box_pk: &[u8; 32],
    recipient_box_pk: &[u8; 32],
    eph_pk: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ts: u64,
    ciphertext: &[u8],
) -> Vec<u8> {
    concat(&[
        DOMAIN,
        sender_sign_pk,
        sender_box_pk,
        recipient_box_pk,
        eph_pk,
        nonce,
        &u64be(ts),
        &u32be(ciphertext.len() as u32),
        ciphertext,
    ])
}
