//! Splitting and strict one-shot reassembly.

use dmesh_crypto::message_id;
use dmesh_wire::envelope::KIND_CHUNK;
use dmesh_wire::limits::{CHUNK_OVERHEAD, WIRE_VERSION};
use dmesh_wire::{from_base64, to_base64, Chunk, MessageEnvelope};

use crate::error::{ChunkError, Result};

/// Split a serialized envelope into transport-sized chunks.
///
/// Each chunk carries `max_chunk_size - CHUNK_OVERHEAD` bytes of the
/// envelope's JSON, and every chunk is bound to the envelope's message
/// id (the SHA-512 prefix of its ciphertext).
///
/// # Errors
///
/// `ChunkSizeTooSmall` when the MTU cannot fit the overhead;
/// `Base64DecodeFailed` when the envelope's ciphertext field is
/// malformed.
pub fn chunk(envelope: &MessageEnvelope, max_chunk_size: usize) -> Result<Vec<Chunk>> {
    let data_size = max_chunk_size.saturating_sub(CHUNK_OVERHEAD);
    if data_size == 0 {
        return Err(ChunkError::ChunkSizeTooSmall {
            max_chunk_size,
            overhead: CHUNK_OVERHEAD,
        });
    }

    let ciphertext = from_base64(&envelope.ciphertext)?;
    let msg_id = message_id(&ciphertext).to_base64();

    let serialized = envelope.to_json().into_bytes();
    let total = serialized.len().div_ceil(data_size) as u32;

    let chunks = serialized
        .chunks(data_size)
        .enumerate()
        .map(|(seq, slice)| Chunk {
            v: WIRE_VERSION,
            kind: KIND_CHUNK.into(),
            msg_id: msg_id.clone(),
            seq: seq as u32,
            total,
            data: to_base64(slice),
        })
        .collect();

    Ok(chunks)
}

/// Reassemble a complete chunk set back into its envelope.
///
/// The set may arrive in any order. Every chunk must carry the same
/// message id and total; the sequence numbers must cover `[0, total)`
/// exactly; and the reassembled envelope's ciphertext must hash back to
/// the declared id.
///
/// # Errors
///
/// `IncompleteChunks`, `MissingSequence`, or `MessageIdMismatch`, plus
/// format errors when the concatenated bytes are not an envelope.
pub fn reassemble(chunks: &[Chunk]) -> Result<MessageEnvelope> {
    let first = chunks.first().ok_or(ChunkError::IncompleteChunks {
        received: 0,
        expected: 1,
    })?;
    let total = first.total;
    let msg_id = &first.msg_id;

    for c in chunks {
        if c.msg_id != *msg_id || c.total != total {
            return Err(ChunkError::MessageIdMismatch);
        }
    }

    if chunks.len() != total as usize {
        return Err(ChunkError::IncompleteChunks {
            received: chunks.len(),
            expected: total as usize,
        });
    }

    let mut sorted: Vec<&Chunk> = chunks.iter().collect();
    sorted.sort_by_key(|c| c.seq);
    for (i, c) in sorted.iter().enumerate() {
        if c.seq != i as u32 {
            return Err(ChunkError::MissingSequence {
                expected: i as u32,
                found: c.seq,
            });
        }
    }

    let mut bytes = Vec::new();
    for c in &sorted {
        bytes.extend_from_slice(&from_base64(&c.data)?);
    }

    let text = String::from_utf8(bytes)
        .map_err(|e| ChunkError::InvalidChunk(format!("reassembled bytes not UTF-8: {}", e)))?;
    let envelope = MessageEnvelope::from_json(&text)?;

    // Bind the set to the envelope it claims to carry.
    let ciphertext = from_base64(&envelope.ciphertext)?;
    if message_id(&ciphertext).to_base64() != *msg_id {
        return Err(ChunkError::MessageIdMismatch);
    }

    Ok(envelope)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn chunk_reassemble_identity(
            content_len in 0usize..4096,
            mtu in (CHUNK_OVERHEAD + 1)..4096,
        ) {
            let env = super::tests::sample_envelope(&"x".repeat(content_len));
            let chunks = chunk(&env, mtu).unwrap();
            prop_assert_eq!(reassemble(&chunks).unwrap(), env);
        }
    }
}
