//! Fingerprints and message ids — SHA-512 prefix truncations.
//!
//! Both derivations are part of the wire format: SHA-512 is mandatory
//! (not SHA-256), and the truncation lengths are fixed at 16 bytes for
//! fingerprints and 32 bytes for message ids.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use dmesh_wire::limits::{FINGERPRINT_LEN, MSG_ID_LEN};
use dmesh_wire::{to_base64, to_hex};

use crate::error::{CryptoError, Result};

/// A 16-byte party identifier derived from a signing public key.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint size in bytes.
    pub const SIZE: usize = FINGERPRINT_LEN;

    /// Create a fingerprint from raw bytes.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` unless the input is exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a fingerprint from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = dmesh_wire::from_base64(encoded)?;
        Self::from_bytes(&bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// The base64 wire form.
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Lowercase hex, for display and store keys.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl ConstantTimeEq for Fingerprint {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Fingerprint {}

impl std::hash::Hash for Fingerprint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Bucket selection only; not a cryptographic operation.
        self.0.hash(state);
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte message identifier, deterministic in the ciphertext.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MessageId([u8; MSG_ID_LEN]);

impl MessageId {
    /// Message id size in bytes.
    pub const SIZE: usize = MSG_ID_LEN;

    /// Create a message id from raw bytes.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` unless the input is exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a message id from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = dmesh_wire::from_base64(encoded)?;
        Self::from_bytes(&bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; MSG_ID_LEN] {
        &self.0
    }

    /// The base64 wire form.
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Lowercase hex, for display and store keys.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl ConstantTimeEq for MessageId {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for MessageId {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for MessageId {}

impl std::hash::Hash for MessageId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Debug for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageId({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for MessageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Derive a fingerprint: the first 16 bytes of SHA-512 of the signing
/// public key.
pub fn fingerprint(sign_pk: &[u8; 32]) -> Fingerprint {
    let digest = Sha512::digest(sign_pk);
    let mut arr = [0u8; FINGERPRINT_LEN];
    arr.copy_from_slice(&digest[..FINGERPRINT_LEN]);
    Fingerprint(arr)
}

/// Derive a message id: the first 32 bytes of SHA-512 of the ciphertext.
pub fn message_id(ciphertext: &[u8]) -> MessageId {
    let digest = Sha512::digest(ciphertext);
    let mut arr = [0u8; MSG_ID_LEN];
    arr.copy_from_slice(&digest[..MSG_ID_LEN]);
    MessageId(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha512};

    #[test]
    fn test_fingerprint_is_sha512_prefix() {
        let pk = [7u8; 32];
        let fp = fingerprint(&pk);
        let digest = Sha512::digest(pk);
        assert_eq!(fp.as_bytes(), &digest[..16]);
    }

    #[test]
    fn test_message_id_is_sha512_prefix() {
        let ct = b"some ciphertext bytes";
        let id = message_id(ct);
        let digest = Sha512::digest(ct);
        assert_eq!(id.as_bytes(), &digest[..32]);
    }

    #[test]
    fn test_derivations_are_deterministic() {
        let pk = [42u8; 32];
        assert_eq!(fingerprint(&pk), fingerprint(&pk));
        assert_eq!(message_id(b"ct"), message_id(b"ct"));
        assert_ne!(message_id(b"ct"), message_id(b"ct2"));
    }

    #[test]
    fn test_fingerprint_base64_round_trip() {
        let fp = fingerprint(&[1u8; 32]);
        let back = Fingerprint::from_base64(&fp.to_base64()).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_message_id_base64_round_trip() {
        let id = message_id(b"payload");
        let back = MessageId::from_base64(&id.to_base64()).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_length_enforcement() {
        assert!(Fingerprint::from_bytes(&[0u8; 15]).is_err());
        assert!(Fingerprint::from_bytes(&[0u8; 17]).is_err());
        assert!(MessageId::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_hex_display() {
        let fp = Fingerprint::from_bytes(&[0xab; 16]).unwrap();
        assert_eq!(fp.to_hex().len(), 32);
        assert!(fp.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
