//! Fuzz target for chunk reassembly.
//!
//! Arbitrary chunk sets must reassemble or fail cleanly; a collector
//! fed hostile chunks must stay within its bounds.

#![no_main]

use libfuzzer_sys::fuzz_target;
use dmesh_chunk::{reassemble, ChunkCollector};
use dmesh_wire::Chunk;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(chunks) = serde_json::from_str::<Vec<Chunk>>(text) else {
        return;
    };

    let _ = reassemble(&chunks);

    let mut collector = ChunkCollector::new();
    for chunk in chunks {
        let _ = collector.add(chunk, 0);
    }
});
