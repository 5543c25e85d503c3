//! Per-peer session rate limiting.
//!
//! A sliding one-minute window bounds how often any single peer can
//! open sessions, so a hostile neighbor cannot spin the engine (and its
//! store traffic) in a loop.

use std::collections::HashMap;

use dmesh_crypto::Fingerprint;

use crate::limits::{DEFAULT_SESSIONS_PER_MINUTE, RATE_WINDOW_MS};

/// Sliding-window session limiter.
#[derive(Debug, Clone)]
pub struct SessionRateLimiter {
    window_ms: u64,
    max_sessions: usize,
    history: HashMap<Fingerprint, Vec<u64>>,
}

impl SessionRateLimiter {
    /// Create a limiter with the default window and ceiling.
    pub fn new() -> Self {
        Self::with_limits(RATE_WINDOW_MS, DEFAULT_SESSIONS_PER_MINUTE)
    }

    /// Create a limiter with explicit window and ceiling.
    pub fn with_limits(window_ms: u64, max_sessions: usize) -> Self {
        Self {
            window_ms,
            max_sessions,
            history: HashMap::new(),
        }
    }

    /// Record a session attempt; `true` when the peer is within limits.
    pub fn allow_session(&mut self, peer_fp: &Fingerprint, now_ms: u64) -> bool {
        let window = self.window_ms;
        let timestamps = self.history.entry(*peer_fp).or_default();
        timestamps.retain(|&t| now_ms.saturating_sub(t) < window);
        if timestamps.len() >= self.max_sessions {
            return false;
        }
        timestamps.push(now_ms);
        true
    }

    /// Drop peers with no activity inside the window.
    pub fn prune(&mut self, now_ms: u64) {
        let window = self.window_ms;
        self.history
            .retain(|_, timestamps| timestamps.iter().any(|&t| now_ms.saturating_sub(t) < window));
    }
}

impl Default for SessionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
