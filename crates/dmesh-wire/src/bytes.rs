//! Exact byte-level encoders.
//!
//! These feed the signing-byte construction, so their output is fixed
//! for all time: 4- and 8-byte big-endian integers and plain
//! concatenation, nothing else.

/// Encode a `u32` as exactly 4 big-endian bytes.
pub fn u32be(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Encode a `u64` as exactly 8 big-endian bytes.
///
/// Millisecond timestamps fit comfortably (they stay below 2^53), but
/// the full `u64` range is representable.
pub fn u64be(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Concatenate byte slices into one owned buffer, in order.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn u32be_round_trips(n in any::<u32>()) {
            prop_assert_eq!(u32::from_be_bytes(u32be(n)), n);
        }

        #[test]
        fn u64be_round_trips(n in any::<u64>()) {
            prop_assert_eq!(u64::from_be_bytes(u64be(n)), n);
        }

        #[test]
        fn concat_length_is_sum(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
            let joined = concat(&[&a, &b]);
            prop_assert_eq!(joined.len(), a.len() + b.len());
            prop_assert_eq!(&joined[..a.len()], &a[..]);
            prop_assert_eq!(&joined[a.len()..], &b[..]);
        }
    }
}
