//! Reachability queries over an immutable [`PinSnapshot`].
//!
//! Nothing here touches pin storage or locks; the caller hands in a
//!  snapshot and a walker. Precedence: a block in the direct or recursive
//!  set is never classified as indirect, even when a recursive pin also
//!  reaches it, so every block appears at most once across a listing.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::{Pin, PinReason, PinSnapshot, PinStatus, PinType};
use crate::dag::{DagError, DagWalker};
use crate::linked_data::{BlockKey, Cid};

/// Look up how `cid` is pinned, restricted to `pin_type`.
///
/// Checks the direct set, then the recursive set, then walks each
///  recursive pin in insertion order; the first one that reaches `cid`
///  is reported as the ancestor.
pub async fn pinned_with_type(
    snapshot: &PinSnapshot,
    walker: &dyn DagWalker,
    cid: &Cid,
    pin_type: PinType,
) -> Result<PinStatus, DagError> {
    let not_pinned = PinStatus {
        cid: *cid,
        reason: None,
    };

    if pin_type.includes_direct() && snapshot.is_direct(cid) {
        return Ok(PinStatus {
            cid: *cid,
            reason: Some(PinReason::Direct),
        });
    }
    if pin_type.includes_recursive() && snapshot.is_recursive(cid) {
        return Ok(PinStatus {
            cid: *cid,
            reason: Some(PinReason::Recursive),
        });
    }
    if !pin_type.includes_indirect() {
        return Ok(not_pinned);
    }

    let key = BlockKey::from(cid);
    if snapshot.is_stored(&key) {
        return Ok(not_pinned);
    }
    for root in snapshot.recursive() {
        let descendants = walker.descendants(root).await?;
        if descendants.iter().any(|d| BlockKey::from(d) == key) {
            return Ok(PinStatus {
                cid: *cid,
                reason: Some(PinReason::Indirect { via: *root }),
            });
        }
    }

    Ok(not_pinned)
}

/// Every indirectly pinned block, attributed to the first recursive pin
///  that reaches it.
pub async fn indirect(
    snapshot: &PinSnapshot,
    walker: &dyn DagWalker,
) -> Result<Vec<Pin>, DagError> {
    let mut found: IndexMap<BlockKey, Pin> = IndexMap::new();

    for root in snapshot.recursive() {
        for cid in walker.descendants(root).await? {
            let key = BlockKey::from(&cid);
            if snapshot.is_stored(&key) || found.contains_key(&key) {
                continue;
            }
            found.insert(
                key,
                Pin {
                    cid,
                    reason: PinReason::Indirect { via: *root },
                },
            );
        }
    }

    Ok(found.into_values().collect())
}

/// List pins of the requested type: direct, then recursive, then indirect
pub async fn list(
    snapshot: &PinSnapshot,
    walker: &dyn DagWalker,
    pin_type: PinType,
) -> Result<Vec<Pin>, DagError> {
    let mut pins = Vec::new();

    if pin_type.includes_direct() {
        pins.extend(snapshot.direct().map(|cid| Pin {
            cid: *cid,
            reason: PinReason::Direct,
        }));
    }
    if pin_type.includes_recursive() {
        pins.extend(snapshot.recursive().map(|cid| Pin {
            cid: *cid,
            reason: PinReason::Recursive,
        }));
    }
    if pin_type.includes_indirect() {
        pins.extend(indirect(snapshot, walker).await?);
    }

    Ok(pins)
}

/// Block keys of every recursive pin and everything they reach
pub async fn recursive_closure(
    snapshot: &PinSnapshot,
    walker: &dyn DagWalker,
) -> Result<HashSet<BlockKey>, DagError> {
    // keyed by full CID; a raw alias of a root does not cover its links
    let mut reached: HashSet<Cid> = HashSet::new();
    for root in snapshot.recursive() {
        if !reached.insert(*root) {
            continue;
        }
        reached.extend(walker.descendants(root).await?);
    }
    Ok(reached.iter().map(BlockKey::from).collect())
}
