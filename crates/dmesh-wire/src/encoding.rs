//! Encoding utilities — base64 and hex.
//!
//! All byte fields on the wire use standard base64 (RFC 4648, with
//! padding). Hex is used only for human-readable display of ids and
//! fingerprints.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Result, WireError};

/// Encode bytes to standard base64 (padded).
pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64 to bytes.
///
/// # Errors
///
/// Returns `WireError::Base64DecodeFailed` on invalid input.
pub fn from_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| WireError::Base64DecodeFailed(e.to_string()))
}

/// Decode base64 that must yield exactly `len` bytes.
///
/// # Errors
///
/// `Base64DecodeFailed` on malformed input, `InvalidKeyLength` when the
/// decoded length differs from `len`.
pub fn from_base64_exact(encoded: &str, len: usize) -> Result<Vec<u8>> {
    let bytes = from_base64(encoded)?;
    if bytes.len() != len {
        return Err(WireError::InvalidKeyLength {
            expected: len,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Encode bytes as a lowercase hex string.
pub fn to_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for byte in data {
        s.push_str(&format!("{:02x}", byte));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        let input = b"Hello, dmesh!";
        let encoded = to_base64(input);
        let decoded = from_base64(&encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn base64_empty() {
        assert_eq!(to_base64(&[]), "");
        assert_eq!(from_base64("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn base64_known_value() {
        assert_eq!(to_base64(b"Hello, dmesh!"), "SGVsbG8sIGRtZXNoIQ==");
        assert_eq!(
            from_base64("SGVsbG8sIGRtZXNoIQ==").unwrap(),
            b"Hello, dmesh!"
        );
    }

    #[test]
    fn base64_rejects_invalid() {
        assert!(from_base64("!!!not base64!!!").is_err());
    }

    #[test]
    fn base64_all_byte_values_round_trip() {
        let input: Vec<u8> = (0..=255).collect();
        assert_eq!(from_base64(&to_base64(&input)).unwrap(), input);
    }

    #[test]
    fn base64_exact_length_enforced() {
        let encoded = to_base64(&[0u8; 32]);
        assert!(from_base64_exact(&encoded, 32).is_ok());
        let err = from_base64_exact(&encoded, 24).unwrap_err();
        assert!(matches!(err, WireError::InvalidKeyLength { .. }));
    }

    #[test]
    fn hex_known_values() {
        assert_eq!(to_hex(&[]), "");
        assert_eq!(to_hex(&[0xff]), "ff");
        assert_eq!(to_hex(&[0x00, 0x0a, 0xff]), "000aff");
    }
}
