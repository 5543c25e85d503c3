//! Sync protocol limits and default capabilities.

use dmesh_wire::SyncCapabilities;

/// Sync protocol version advertised in HELLO.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest single message accepted unchunked (64 KiB).
pub const DEFAULT_MAX_MSG_SIZE: usize = 64 * 1024;

/// Most inventory items read from a peer.
pub const DEFAULT_MAX_INV_COUNT: usize = 128;

/// Most data items (envelopes plus chunks) per DATA frame.
pub const DEFAULT_MAX_CHUNKS: usize = 256;

/// Byte budget requested per session (512 KiB).
pub const DEFAULT_MAX_SYNC_BYTES: usize = 512 * 1024;

/// Sessions accepted from one peer per minute.
pub const DEFAULT_SESSIONS_PER_MINUTE: usize = 4;

/// The rate-limit window in milliseconds.
pub const RATE_WINDOW_MS: u64 = 60 * 1000;

/// Default capability advertisement.
pub fn default_capabilities() -> SyncCapabilities {
    SyncCapabilities {
        max_msg_size: DEFAULT_MAX_MSG_SIZE,
        max_inv_count: DEFAULT_MAX_INV_COUNT,
        max_chunks: DEFAULT_MAX_CHUNKS,
        supported_kinds: vec!["dmesh-msg".into(), "dmesh-chunk".into()],
        protocol_version: PROTOCOL_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capabilities() {
        let caps = default_capabilities();
        assert_eq!(caps.protocol_version, 1);
        assert!(caps.supported_kinds.contains(&"dmesh-msg".to_string()));
        assert!(caps.max_msg_size > 0);
    }
}
