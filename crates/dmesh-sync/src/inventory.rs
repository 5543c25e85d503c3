//! Inventory construction and want selection.

use dmesh_crypto::{Fingerprint, MessageId};
use dmesh_store::Store;
use dmesh_wire::SyncInvItem;

use crate::error::Result;
use crate::priority::priority_for;

/// Build the inventory offered to a peer.
///
/// From outbox entries still worth forwarding, drops anything expired,
/// anything the peer already confirmed holding, and anything the peer
/// itself authored, then keeps the highest-priority (earliest-expiring
/// on ties) entries up to `max_items`.
pub fn build_inventory(
    store: &Store,
    peer_fp: &Fingerprint,
    max_items: usize,
    now_ms: u64,
) -> Result<Vec<SyncInvItem>> {
    let mut items = Vec::new();

    for entry in store.outbox.pending()? {
        if entry.exp < now_ms {
            continue;
        }
        if store.forwarded.was_forwarded(peer_fp, &entry.msg_id)? {
            continue;
        }
        if entry.sender_fp.as_ref() == Some(peer_fp) {
            continue;
        }
        items.push(SyncInvItem {
            msg_id: entry.msg_id.to_base64(),
            exp: entry.exp,
            size: entry.envelope_json.len(),
            priority: priority_for(entry.payload_type.as_deref(), entry.urgency.as_deref()),
        });
    }

    sort_by_priority(&mut items);
    items.truncate(max_items);
    Ok(items)
}

/// Select which offered items to request, under a byte budget.
///
/// Already-held and expired items are skipped; the rest are taken
/// greedily in priority order until the budget runs out.
pub fn select_wants(
    store: &Store,
    items: &[SyncInvItem],
    max_bytes: usize,
    now_ms: u64,
) -> Result<Vec<String>> {
    let mut candidates = Vec::new();
    for item in items {
        if item.exp < now_ms {
            continue;
        }
        let Ok(msg_id) = MessageId::from_base64(&item.msg_id) else {
            // An unparseable id cannot be requested; skip it.
            continue;
        };
        if store.seen.has_msg_id(&msg_id)? {
            continue;
        }
        if store.outbox.get(&msg_id)?.is_some() {
            continue;
        }
        candidates.push(item.clone());
    }

    sort_by_priority(&mut candidates);

    let mut want = Vec::new();
    let mut budget = max_bytes;
    for item in candidates {
        if item.size > budget {
            continue;
        }
        budget -= item.size;
        want.push(item.msg_id);
    }
    Ok(want)
}

fn sort_by_priority(items: &mut [SyncInvItem]) {
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.exp.cmp(&b.exp))
    });
}
