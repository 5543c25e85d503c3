//! Long-term and ephemeral key pairs.
//!
//! - [`SigningKeyPair`]: Ed25519, long-term. Identity continuity equals
//!   signing-key continuity.
//! - [`BoxKeyPair`]: X25519, long-term, used as the recipient key of the
//!   NaCl box construction.
//! - [`EphemeralBoxKeyPair`]: X25519, generated per sent message and
//!   consumed by sealing; its secret never leaves this crate.
//!
//! All secret material is zeroized on drop.

use crypto_box::SecretKey;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use zeroize::Zeroize;

use dmesh_wire::limits::{BOX_SK_LEN, SIGN_SK_LEN};

use crate::error::{CryptoError, Result};

/// An Ed25519 identity key pair.
///
/// The secret encoding is the 64-byte NaCl layout: seed followed by the
/// public key.
pub struct SigningKeyPair {
    signing: SigningKey,
}

impl SigningKeyPair {
    /// Generate a fresh pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Derive a pair deterministically from a 32-byte seed.
    ///
    /// Used for key restoration and test vectors; never derive seeds
    /// from low-entropy input.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a pair from its 64-byte secret encoding.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` on a wrong-sized slice, `KeyGenerationFailed`
    /// when the seed and public half are inconsistent.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGN_SK_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: SIGN_SK_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; SIGN_SK_LEN];
        arr.copy_from_slice(bytes);
        let signing = SigningKey::from_keypair_bytes(&arr)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        arr.zeroize();
        Ok(Self { signing })
    }

    /// The 32-byte public key.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// The 64-byte secret encoding (seed plus public half).
    pub fn secret_bytes(&self) -> [u8; 64] {
        self.signing.to_keypair_bytes()
    }

    /// Produce a detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &dmesh_wire::to_hex(&self.public_bytes()[..8]))
            .finish_non_exhaustive()
    }
}

/// Verify a detached Ed25519 signature.
///
/// # Errors
///
/// `SignatureInvalid` when the public key is not a valid curve point or
/// the signature does not verify.
pub fn verify_detached(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<()> {
    let key = VerifyingKey::from_bytes(public_key).map_err(|_| CryptoError::SignatureInvalid)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    key.verify(message, &sig)
        .map_err(|_| CryptoError::SignatureInvalid)
}

/// A long-term X25519 box key pair.
pub struct BoxKeyPair {
    secret: SecretKey,
}

impl BoxKeyPair {
    /// Generate a fresh pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct a pair from its 32-byte secret.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` on a wrong-sized slice.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BOX_SK_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: BOX_SK_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; BOX_SK_LEN];
        arr.copy_from_slice(bytes);
        let secret = SecretKey::from(arr);
        arr.zeroize();
        Ok(Self { secret })
    }

    /// The 32-byte public key.
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.secret.public_key().as_bytes()
    }

    /// The 32-byte secret key.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Borrow the secret for box operations.
    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for BoxKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxKeyPair")
            .field("public", &dmesh_wire::to_hex(&self.public_bytes()[..8]))
            .finish_non_exhaustive()
    }
}

/// A single-use X25519 key pair, generated per sent message.
///
/// Sealing consumes the pair; the secret is zeroized when the value
/// drops, immediately after the box is built.
pub struct EphemeralBoxKeyPair {
    secret: SecretKey,
}

impl EphemeralBoxKeyPair {
    /// Generate a fresh ephemeral pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    /// The 32-byte public key, carried in the envelope.
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.secret.public_key().as_bytes()
    }

    /// Consume the pair, yielding the secret for sealing.
    pub(crate) fn into_secret(self) -> SecretKey {
        self.secret
    }
}

impl std::fmt::Debug for EphemeralBoxKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralBoxKeyPair([REDACTED])")
    }
}
