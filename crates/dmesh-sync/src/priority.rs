//! Scheduling priorities for scarce bandwidth.
//!
//! Emergency traffic goes first. The mapping is fixed by the protocol:
//!
//! | priority | payload |
//! |---------:|---------|
//! | 5 | `medical`, `need_help` at critical urgency |
//! | 4 | `need_help` at high urgency |
//! | 3 | `shelter_info`, `supplies` |
//! | 2 | `im_safe` |
//! | 1 | `text` |
//! | 0 | bulk / unknown |

use dmesh_wire::payload;

/// Highest priority: life-safety traffic.
pub const PRIORITY_MEDICAL: u8 = 5;
/// Lowest priority: bulk or unrecognized payloads.
pub const PRIORITY_BULK: u8 = 0;

/// Map a payload type (and urgency, where the type carries one) to its
/// scheduling priority.
pub fn priority_for(payload_type: Option<&str>, urgency: Option<&str>) -> u8 {
    match payload_type {
        Some(payload::TYPE_MEDICAL) => PRIORITY_MEDICAL,
        Some(payload::TYPE_NEED_HELP) => match urgency {
            Some("critical") => PRIORITY_MEDICAL,
            Some("high") => 4,
            _ => 3,
        },
        Some(payload::TYPE_SHELTER_INFO) | Some(payload::TYPE_SUPPLIES) => 3,
        Some(payload::TYPE_IM_SAFE) => 2,
        Some(payload::TYPE_TEXT) => 1,
        _ => PRIORITY_BULK,
    }
}
