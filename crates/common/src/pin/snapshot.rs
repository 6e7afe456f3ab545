use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PinKind;
use crate::linked_data::{BlockKey, Cid};

/// Point-in-time copy of the stored pin sets.
///
/// Both sets are keyed by block key and keep insertion order, which is
///  what makes indirect-pin attribution deterministic: the first
///  recursive pin (in the order pins were added) that reaches a block is
///  the one reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSnapshot {
    direct: IndexMap<BlockKey, Cid>,
    recursive: IndexMap<BlockKey, Cid>,
}

/// On-disk form of the pin sets, stored as a DAG-CBOR block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PinRoot {
    pub version: u64,
    pub direct: Vec<Cid>,
    pub recursive: Vec<Cid>,
}

pub(crate) const PIN_ROOT_VERSION: u64 = 1;

impl PinSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_direct(&self, cid: &Cid) -> bool {
        self.direct.contains_key(&BlockKey::from(cid))
    }

    pub fn is_recursive(&self, cid: &Cid) -> bool {
        self.recursive.contains_key(&BlockKey::from(cid))
    }

    /// True if the key is in either stored set
    pub fn is_stored(&self, key: &BlockKey) -> bool {
        self.direct.contains_key(key) || self.recursive.contains_key(key)
    }

    pub fn direct(&self) -> impl Iterator<Item = &Cid> {
        self.direct.values()
    }

    pub fn recursive(&self) -> impl Iterator<Item = &Cid> {
        self.recursive.values()
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.recursive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.recursive.is_empty()
    }

    /// Record a pin, returning false if it was already present
    pub(crate) fn insert(&mut self, cid: Cid, kind: PinKind) -> bool {
        let set = match kind {
            PinKind::Direct => &mut self.direct,
            PinKind::Recursive => &mut self.recursive,
        };
        set.insert(BlockKey::from(&cid), cid).is_none()
    }

    /// Drop a pin, returning false if it was not present with that kind
    pub(crate) fn remove(&mut self, cid: &Cid, kind: PinKind) -> bool {
        let set = match kind {
            PinKind::Direct => &mut self.direct,
            PinKind::Recursive => &mut self.recursive,
        };
        set.shift_remove(&BlockKey::from(cid)).is_some()
    }

    pub(crate) fn to_root(&self) -> PinRoot {
        PinRoot {
            version: PIN_ROOT_VERSION,
            direct: self.direct.values().copied().collect(),
            recursive: self.recursive.values().copied().collect(),
        }
    }

    pub(crate) fn from_root(root: PinRoot) -> Self {
        let mut snapshot = Self::new();
        for cid in root.direct {
            snapshot.insert(cid, PinKind::Direct);
        }
        for cid in root.recursive {
            snapshot.insert(cid, PinKind::Recursive);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linked_data::{cid_for, BlockFormat, HashAlg, DAG_CBOR};

    fn cid(data: &[u8]) -> Cid {
        cid_for(data, BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap()
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut snapshot = PinSnapshot::new();
        assert!(snapshot.insert(cid(b"a"), PinKind::Direct));
        assert!(!snapshot.insert(cid(b"a"), PinKind::Direct));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_lookup_by_block_key() {
        let mut snapshot = PinSnapshot::new();
        let raw = cid(b"a");
        snapshot.insert(raw, PinKind::Recursive);

        let cbor = Cid::new_v1(DAG_CBOR, *raw.hash());
        assert!(snapshot.is_recursive(&cbor));
        assert!(!snapshot.is_direct(&cbor));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut snapshot = PinSnapshot::new();
        let (a, b, c) = (cid(b"a"), cid(b"b"), cid(b"c"));
        for x in [a, b, c] {
            snapshot.insert(x, PinKind::Recursive);
        }
        assert!(snapshot.remove(&b, PinKind::Recursive));
        assert!(!snapshot.remove(&b, PinKind::Recursive));
        assert!(!snapshot.remove(&a, PinKind::Direct));
        assert_eq!(snapshot.recursive().copied().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn test_root_roundtrip_preserves_order() {
        let mut snapshot = PinSnapshot::new();
        snapshot.insert(cid(b"z"), PinKind::Recursive);
        snapshot.insert(cid(b"y"), PinKind::Recursive);
        snapshot.insert(cid(b"x"), PinKind::Direct);

        let bytes = serde_ipld_dagcbor::to_vec(&snapshot.to_root()).unwrap();
        let root: PinRoot = serde_ipld_dagcbor::from_slice(&bytes).unwrap();
        let restored = PinSnapshot::from_root(root);
        assert_eq!(restored, snapshot);
        assert_eq!(
            restored.recursive().collect::<Vec<_>>(),
            snapshot.recursive().collect::<Vec<_>>()
        );
    }
}
