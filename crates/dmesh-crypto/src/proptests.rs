//! Property tests for the crypto core.

use proptest::prelude::*;

use crate::decrypt::{decrypt, DecryptOptions};
use crate::encrypt::{encrypt, EncryptOptions};
use crate::ids::{fingerprint, message_id};
use crate::keys::{BoxKeyPair, SigningKeyPair};
use crate::safety_number::safety_number;
use dmesh_wire::{from_base64, to_base64};

const TS: u64 = 1_706_012_345_678;

fn opts_at(now: u64) -> DecryptOptions<'static> {
    DecryptOptions {
        now_ms: Some(now),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn encrypt_decrypt_round_trips(content in "\\PC{0,512}") {
        let sign = SigningKeyPair::generate();
        let sender_box = BoxKeyPair::generate();
        let recipient = BoxKeyPair::generate();

        let env = encrypt(
            &content,
            &sign,
            &sender_box,
            &recipient.public_bytes(),
            EncryptOptions { ts: Some(TS), ..Default::default() },
        ).unwrap();

        let msg = decrypt(&env, &recipient, opts_at(TS)).unwrap();
        prop_assert_eq!(msg.content, content);
        prop_assert_eq!(msg.ts, TS);
    }

    #[test]
    fn tampering_any_ciphertext_bit_is_rejected(
        content in "\\PC{1,64}",
        byte_index in 0usize..16,
        bit in 0u8..8,
    ) {
        let sign = SigningKeyPair::generate();
        let sender_box = BoxKeyPair::generate();
        let recipient = BoxKeyPair::generate();

        let mut env = encrypt(
            &content,
            &sign,
            &sender_box,
            &recipient.public_bytes(),
            EncryptOptions { ts: Some(TS), ..Default::default() },
        ).unwrap();

        let mut ct = from_base64(&env.ciphertext).unwrap();
        let index = byte_index % ct.len();
        ct[index] ^= 1 << bit;
        env.ciphertext = to_base64(&ct);
        env.msg_id = None;

        let err = decrypt(&env, &recipient, opts_at(TS)).unwrap_err();
        prop_assert_eq!(err.code(), "SignatureInvalid");
    }

    #[test]
    fn message_id_is_stable(ct in any::<Vec<u8>>()) {
        prop_assert_eq!(message_id(&ct), message_id(&ct));
    }

    #[test]
    fn safety_number_is_symmetric(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
        let fp_a = fingerprint(&a);
        let fp_b = fingerprint(&b);
        prop_assert_eq!(safety_number(&fp_a, &fp_b), safety_number(&fp_b, &fp_a));
    }

    #[test]
    fn wrong_recipient_never_opens(content in "\\PC{0,64}") {
        let sign = SigningKeyPair::generate();
        let sender_box = BoxKeyPair::generate();
        let recipient = BoxKeyPair::generate();
        let other = BoxKeyPair::generate();

        let env = encrypt(
            &content,
            &sign,
            &sender_box,
            &recipient.public_bytes(),
            EncryptOptions { ts: Some(TS), ..Default::default() },
        ).unwrap();

        let err = decrypt(&env, &other, opts_at(TS)).unwrap_err();
        prop_assert_eq!(err.code(), "RecipientMismatch");
    }
}
