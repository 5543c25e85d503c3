//! Protocol constants and limits.
//!
//! All protocol limits are defined here for consistent enforcement.

// === Domain separation ===

/// Domain tag prefixed to the signing bytes of every message (12 ASCII bytes).
pub const DOMAIN: &[u8; 12] = b"DMESH_MSG_V1";

/// Wire protocol version carried in every envelope and frame.
pub const WIRE_VERSION: u32 = 1;

// === Message limits ===

/// Maximum plaintext content size in bytes (UTF-8).
pub const MAX_BYTES: usize = 150 * 1024;

/// Maximum clock skew tolerated in strict validity mode (10 minutes).
pub const MAX_SKEW_MS: u64 = 10 * 60 * 1000;

/// Default message time-to-live (7 days).
pub const DEFAULT_TTL_MS: u64 = 7 * 24 * 3600 * 1000;

// === Retention ===

/// Seen-set retention window (30 days).
pub const SEEN_RETENTION_MS: u64 = 30 * 24 * 3600 * 1000;

/// Partial-chunk retention window (24 hours).
pub const CHUNK_RETENTION_MS: u64 = 24 * 3600 * 1000;

// === Fixed byte lengths ===

/// NaCl box nonce length.
pub const NONCE_LEN: usize = 24;

/// Ed25519 detached signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key length.
pub const SIGN_PK_LEN: usize = 32;

/// Ed25519 secret key length (seed plus public half).
pub const SIGN_SK_LEN: usize = 64;

/// X25519 public key length.
pub const BOX_PK_LEN: usize = 32;

/// X25519 secret key length.
pub const BOX_SK_LEN: usize = 32;

/// Fingerprint length (truncated SHA-512 of a signing public key).
pub const FINGERPRINT_LEN: usize = 16;

/// Message id length (truncated SHA-512 of the ciphertext).
pub const MSG_ID_LEN: usize = 32;

// === Chunking ===

/// Per-chunk envelope overhead budget (JSON framing plus base64 growth).
pub const CHUNK_OVERHEAD: usize = 150;

/// Recommended chunk ceiling for QR frames.
pub const QR_MAX_CHUNK: usize = 2048;

/// Recommended chunk ceiling for SMS segments.
pub const SMS_MAX_CHUNK: usize = 1200;

/// Recommended chunk ceiling for LoRa packets.
pub const LORA_MAX_CHUNK: usize = 200;

/// Recommended chunk ceiling for BLE GATT writes.
pub const BLE_MAX_CHUNK: usize = 512;
