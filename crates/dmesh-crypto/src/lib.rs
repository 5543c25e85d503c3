//! # dmesh-crypto
//!
//! Cryptographic core for the dmesh protocol:
//!
//! - **Key pairs**: Ed25519 identity signatures, X25519 box keys, and
//!   per-message ephemeral keys (zeroized after sealing)
//! - **Derivations**: fingerprints, message ids, and safety numbers —
//!   all SHA-512-based and byte-for-byte stable across implementations
//! - **Sealing**: NaCl box (X25519 + XSalsa20-Poly1305) under a fresh
//!   ephemeral key, signed with a domain-separated construction that
//!   binds sender, recipient, ephemeral key, nonce, time, and ciphertext
//! - **Opening**: a fixed-order validation state machine with strict
//!   and delay-tolerant validity modes
//!
//! ## Security
//!
//! Secret keys are zeroized on drop. Key and fingerprint comparisons in
//! the decrypt path are constant-time. The validation order in
//! [`decrypt`] is part of the protocol and must not be rearranged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod identity;
pub mod ids;
pub mod keys;
pub mod safety_number;
pub mod sign_bytes;

#[cfg(test)]
mod proptests;

pub use decrypt::{
    decrypt, verify_envelope, DecryptOptions, DecryptedMessage, ReplayGuard, ReplayVerdict,
    ValidityMode, VerifiedEnvelope,
};
pub use encrypt::{encrypt, EncryptOptions};
pub use error::{CryptoError, Result};
pub use identity::create_public_identity;
pub use ids::{fingerprint, message_id, Fingerprint, MessageId};
pub use keys::{BoxKeyPair, EphemeralBoxKeyPair, SigningKeyPair};
pub use safety_number::safety_number;
pub use sign_bytes::build_sign_bytes;
