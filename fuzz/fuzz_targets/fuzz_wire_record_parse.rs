//! Fuzz target for wire record parsing.
//!
//! Arbitrary text must never panic the parser; it either yields a
//! record or a structured error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use dmesh_wire::WireRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = WireRecord::parse(text);
    }
});
