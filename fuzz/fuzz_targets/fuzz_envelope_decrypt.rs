//! Fuzz target for the decrypt state machine.
//!
//! Hostile envelopes must always land in a structured error, never a
//! panic, and never a successful decrypt (the fuzzer cannot forge an
//! Ed25519 signature over the domain-separated bytes).

#![no_main]

use libfuzzer_sys::fuzz_target;
use dmesh_crypto::{decrypt, BoxKeyPair, DecryptOptions};
use dmesh_wire::MessageEnvelope;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(envelope) = MessageEnvelope::from_json(text) else {
        return;
    };
    let recipient = BoxKeyPair::generate();
    assert!(decrypt(&envelope, &recipient, DecryptOptions::default()).is_err());
});
