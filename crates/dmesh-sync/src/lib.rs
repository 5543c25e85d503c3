//! # dmesh-sync
//!
//! Two briefly connected peers reconcile their message inventories over
//! any bidirectional frame channel:
//!
//! ```text
//! Idle → HelloSent ↔ HelloRcvd → InvSent ↔ InvRcvd
//!      → GetSent   ↔ DataRcvd  → AckSent ↔ AckRcvd → Complete
//! ```
//!
//! Every frame is Ed25519-signed by the sending peer. Inventory
//! construction is forwarding-aware (nothing a peer already holds is
//! offered again), want selection runs under a byte budget with
//! emergency-first priorities, and oversized envelopes are chunked to
//! the peer's advertised limit.
//!
//! Invalid or out-of-order frames abort the session with no store
//! writes; forwarding receipts are recorded only against a signed ACK.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod inventory;
pub mod limits;
pub mod priority;
pub mod rate_limit;
pub mod session;
pub mod signing;

pub use engine::{CancelToken, SessionReport, SyncConfig, SyncEngine};
pub use error::{Result, SyncError};
pub use inventory::{build_inventory, select_wants};
pub use priority::priority_for;
pub use rate_limit::SessionRateLimiter;
pub use session::{SessionConfig, SessionOutput, SessionPhase, SyncSession};
pub use signing::{signature_for, verify_frame_signature};
