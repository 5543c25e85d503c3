//! Safety numbers for out-of-band identity verification.
//!
//! Two users compare an 8-digit number (spoken, or over any second
//! channel) to confirm they hold each other's real keys. The derivation
//! is symmetric: both parties compute the same number regardless of
//! argument order, because it is built from the XOR of their
//! fingerprints.

use crate::ids::Fingerprint;

/// Modulus producing exactly 8 decimal digits.
const SAFETY_NUMBER_MOD: u32 = 100_000_000;

/// Derive the safety number for a pair of parties.
///
/// The first four bytes of `fp_a XOR fp_b` are read as a big-endian
/// `u32`, reduced modulo 10^8, and rendered `"NNNN-NNNN"`.
///
/// `safety_number(a, b) == safety_number(b, a)` for all fingerprints.
pub fn safety_number(fp_a: &Fingerprint, fp_b: &Fingerprint) -> String {
    let a = fp_a.as_bytes();
    let b = fp_b.as_bytes();

    let mut xored = [0u8; 4];
    for i in 0..4 {
        xored[i] = a[i] ^ b[i];
    }

    let number = u32::from_be_bytes(xored) % SAFETY_NUMBER_MOD;
    let digits = format!("{:08}", number);
    format!("{}-{}", &digits[..4], &digits[4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::fingerprint;

    #[test]
    fn test_symmetric() {
        let a = fingerprint(&[1u8; 32]);
        let b = fingerprint(&[2u8; 32]);
        assert_eq!(safety_number(&a, &b), safety_number(&b, &a));
    }

    #[test]
    fn test_format() {
        let a = fingerprint(&[3u8; 32]);
        let b = fingerprint(&[4u8; 32]);
        let sn = safety_number(&a, &b);
        assert_eq!(sn.len(), 9);
        assert_eq!(&sn[4..5], "-");
        assert!(sn[..4].chars().all(|c| c.is_ascii_digit()));
        assert!(sn[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_self_pair_is_zero() {
        let a = fingerprint(&[9u8; 32]);
        assert_eq!(safety_number(&a, &a), "0000-0000");
    }

    #[test]
    fn test_known_vector() {
        // XOR of the leading bytes drives the number directly.
        let a = Fingerprint::from_bytes(&[0u8; 16]).unwrap();
        let mut b_bytes = [0u8; 16];
        b_bytes[..4].copy_from_slice(&[0x00, 0x00, 0x30, 0x39]); // 12345
        let b = Fingerprint::from_bytes(&b_bytes).unwrap();
        assert_eq!(safety_number(&a, &b), "0001-2345");
    }

    #[test]
    fn test_modulus_applied() {
        let a = Fingerprint::from_bytes(&[0u8; 16]).unwrap();
        let mut b_bytes = [0u8; 16];
        b_bytes[..4].copy_from_slice(&u32::MAX.to_be_bytes());
        let b = Fingerprint::from_bytes(&b_bytes).unwrap();
        // u32::MAX = 4294967295; mod 10^8 = 94967295.
        assert_eq!(safety_number(&a, &b), "9496-7295");
    }

    #[test]
    fn test_distinct_pairs_usually_differ() {
        let a = fingerprint(&[1u8; 32]);
        let b = fingerprint(&[2u8; 32]);
        let c = fingerprint(&[3u8; 32]);
        assert_ne!(safety_number(&a, &b), safety_number(&a, &c));
    }
}
