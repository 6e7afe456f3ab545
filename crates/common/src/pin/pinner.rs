use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::snapshot::{PinRoot, PIN_ROOT_VERSION};
use super::{
    reachability, Pin, PinError, PinKind, PinReason, PinSnapshot, PinStatus, PinType,
};
use crate::block_store::BlockStore;
use crate::dag::DagWalker;
use crate::datastore::{Datastore, DatastoreError, PINS_ROOT_KEY};
use crate::linked_data::{cid_for, BlockFormat, Cid, HashAlg};

/// DAG-CBOR encoding of an empty map
const EMPTY_BLOCK: &[u8] = &[0xa0];

/// Owner of the direct and recursive pin sets.
///
/// Every mutation writes the full pin set as a new DAG-CBOR block,
///  repoints [`PINS_ROOT_KEY`] at it and drops the superseded root
///  block, so pin bookkeeping never shows up in a collection. Callers that need pin changes
///  to be atomic with respect to collection hold the exclusive
///  [`GcLock`](crate::lock::GcLock) around these calls; the pinner only
///  serializes its own writers.
#[derive(Debug)]
pub struct Pinner {
    state: RwLock<PinSnapshot>,
    update: Mutex<()>,
    blocks: Arc<dyn BlockStore>,
    datastore: Arc<dyn Datastore>,
    walker: Arc<dyn DagWalker>,
}

impl Pinner {
    /// Load pin state from the datastore, starting empty if nothing has
    ///  been pinned yet.
    pub async fn load(
        blocks: Arc<dyn BlockStore>,
        datastore: Arc<dyn Datastore>,
        walker: Arc<dyn DagWalker>,
    ) -> Result<Self, PinError> {
        let (empty, data) = Self::empty_block()?;
        blocks.put(&empty, data).await?;

        let snapshot = match Self::root_cid(datastore.as_ref()).await? {
            Some(root_cid) => {
                let data = blocks.get(&root_cid).await?;
                let root: PinRoot = serde_ipld_dagcbor::from_slice(&data)
                    .map_err(|e| PinError::Corrupt(e.to_string()))?;
                if root.version != PIN_ROOT_VERSION {
                    return Err(PinError::Corrupt(format!(
                        "unknown pin root version {}",
                        root.version
                    )));
                }
                PinSnapshot::from_root(root)
            }
            None => PinSnapshot::new(),
        };

        tracing::debug!(pins = snapshot.len(), "pinner loaded");
        Ok(Self {
            state: RwLock::new(snapshot),
            update: Mutex::new(()),
            blocks,
            datastore,
            walker,
        })
    }

    /// Copy of the current pin sets
    pub fn snapshot(&self) -> PinSnapshot {
        self.state.read().clone()
    }

    pub async fn add_direct(&self, cid: &Cid) -> Result<Pin, PinError> {
        let _update = self.update.lock().await;
        let mut next = self.snapshot();
        if next.is_recursive(cid) {
            return Err(PinError::AlreadyPinnedRecursively(*cid));
        }
        if !self.blocks.has(cid).await? {
            return Err(PinError::NotFound(*cid));
        }

        if next.insert(*cid, PinKind::Direct) {
            self.commit(next).await?;
            tracing::info!(cid = %cid, "pinned directly");
        }
        Ok(Pin {
            cid: *cid,
            reason: PinReason::Direct,
        })
    }

    /// Pin `cid` and everything it reaches. Every block in the DAG must
    ///  already be present; a direct pin on the same block is replaced.
    pub async fn add_recursive(&self, cid: &Cid) -> Result<Pin, PinError> {
        let _update = self.update.lock().await;
        let mut next = self.snapshot();

        let descendants = self.walker.descendants(cid).await?;
        tracing::debug!(cid = %cid, descendants = descendants.len(), "verified dag for recursive pin");

        let removed_direct = next.remove(cid, PinKind::Direct);
        let added = next.insert(*cid, PinKind::Recursive);
        if added || removed_direct {
            self.commit(next).await?;
            tracing::info!(cid = %cid, "pinned recursively");
        }
        Ok(Pin {
            cid: *cid,
            reason: PinReason::Recursive,
        })
    }

    pub async fn remove_direct(&self, cid: &Cid) -> Result<Pin, PinError> {
        self.remove(cid, PinKind::Direct).await
    }

    pub async fn remove_recursive(&self, cid: &Cid) -> Result<Pin, PinError> {
        self.remove(cid, PinKind::Recursive).await
    }

    async fn remove(&self, cid: &Cid, kind: PinKind) -> Result<Pin, PinError> {
        let _update = self.update.lock().await;
        let mut next = self.snapshot();
        if !next.remove(cid, kind) {
            return Err(PinError::NotPinned(*cid));
        }
        self.commit(next).await?;
        tracing::info!(cid = %cid, kind = ?kind, "unpinned");

        let reason = match kind {
            PinKind::Direct => PinReason::Direct,
            PinKind::Recursive => PinReason::Recursive,
        };
        Ok(Pin { cid: *cid, reason })
    }

    pub async fn pinned_with_type(
        &self,
        cid: &Cid,
        pin_type: PinType,
    ) -> Result<PinStatus, PinError> {
        let snapshot = self.snapshot();
        Ok(reachability::pinned_with_type(&snapshot, self.walker.as_ref(), cid, pin_type).await?)
    }

    pub async fn ls(&self, pin_type: PinType) -> Result<Vec<Pin>, PinError> {
        let snapshot = self.snapshot();
        Ok(reachability::list(&snapshot, self.walker.as_ref(), pin_type).await?)
    }

    /// Blocks backing the pinner's own bookkeeping: the current root
    ///  block (if any pins were ever written) and the empty sentinel.
    pub async fn internal_blocks(&self) -> Result<Vec<Cid>, PinError> {
        let (empty, _) = Self::empty_block()?;
        let mut cids = vec![empty];
        if let Some(root) = Self::root_cid(self.datastore.as_ref()).await? {
            cids.push(root);
        }
        Ok(cids)
    }

    fn empty_block() -> Result<(Cid, Bytes), PinError> {
        let cid = cid_for(EMPTY_BLOCK, BlockFormat::DagCbor, HashAlg::Sha2_256, 1)
            .map_err(|e| PinError::Corrupt(e.to_string()))?;
        Ok((cid, Bytes::from_static(EMPTY_BLOCK)))
    }

    async fn root_cid(datastore: &dyn Datastore) -> Result<Option<Cid>, PinError> {
        match datastore.get(PINS_ROOT_KEY).await {
            Ok(bytes) => {
                let cid = Cid::try_from(bytes.as_ref())
                    .map_err(|e| PinError::Corrupt(format!("pin root pointer: {}", e)))?;
                Ok(Some(cid))
            }
            Err(DatastoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `next` and make it the live state
    async fn commit(&self, next: PinSnapshot) -> Result<(), PinError> {
        let previous = Self::root_cid(self.datastore.as_ref()).await?;
        let data = serde_ipld_dagcbor::to_vec(&next.to_root())
            .map_err(|e| PinError::Corrupt(e.to_string()))?;
        let root = cid_for(&data, BlockFormat::DagCbor, HashAlg::Sha2_256, 1)
            .map_err(|e| PinError::Corrupt(e.to_string()))?;

        self.blocks.put(&root, Bytes::from(data)).await?;
        self.datastore
            .put(PINS_ROOT_KEY, Bytes::from(root.to_bytes()))
            .await?;
        tracing::debug!(root = %root, pins = next.len(), "pin root written");

        let superseded = previous.filter(|prev| {
            *prev != root && !next.is_direct(prev) && !next.is_recursive(prev)
        });
        *self.state.write() = next;

        // a failed delete leaves the old root for the next collection
        if let Some(prev) = superseded {
            if let Err(e) = self.blocks.delete(&prev).await {
                tracing::warn!(root = %prev, error = %e, "failed to remove superseded pin root");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::MemoryBlockStore;
    use crate::dag::BlockDagWalker;
    use crate::datastore::MemoryDatastore;

    struct Fixture {
        blocks: Arc<MemoryBlockStore>,
        datastore: Arc<MemoryDatastore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                blocks: Arc::new(MemoryBlockStore::new()),
                datastore: Arc::new(MemoryDatastore::new()),
            }
        }

        async fn pinner(&self) -> Pinner {
            let walker = Arc::new(BlockDagWalker::new(self.blocks.clone()));
            Pinner::load(self.blocks.clone(), self.datastore.clone(), walker)
                .await
                .unwrap()
        }

        async fn raw(&self, data: &'static [u8]) -> Cid {
            let cid = cid_for(data, BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap();
            self.blocks.put(&cid, Bytes::from_static(data)).await.unwrap();
            cid
        }
    }

    #[tokio::test]
    async fn test_add_direct_requires_block() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        let missing = cid_for(b"nope", BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap();

        assert!(matches!(
            pinner.add_direct(&missing).await,
            Err(PinError::NotFound(_))
        ));
        assert!(matches!(
            pinner.add_recursive(&missing).await,
            Err(PinError::NotFound(_))
        ));
        assert!(pinner.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        let cid = fixture.raw(b"block").await;

        pinner.add_direct(&cid).await.unwrap();
        pinner.add_direct(&cid).await.unwrap();
        assert_eq!(pinner.ls(PinType::Direct).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recursive_replaces_direct() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        let cid = fixture.raw(b"block").await;

        pinner.add_direct(&cid).await.unwrap();
        pinner.add_recursive(&cid).await.unwrap();

        let snapshot = pinner.snapshot();
        assert!(snapshot.is_recursive(&cid));
        assert!(!snapshot.is_direct(&cid));

        assert!(matches!(
            pinner.add_direct(&cid).await,
            Err(PinError::AlreadyPinnedRecursively(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_requires_matching_kind() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        let cid = fixture.raw(b"block").await;

        pinner.add_recursive(&cid).await.unwrap();
        assert!(matches!(
            pinner.remove_direct(&cid).await,
            Err(PinError::NotPinned(_))
        ));
        pinner.remove_recursive(&cid).await.unwrap();
        assert!(matches!(
            pinner.remove_recursive(&cid).await,
            Err(PinError::NotPinned(_))
        ));
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let fixture = Fixture::new();
        let a = fixture.raw(b"a").await;
        let b = fixture.raw(b"b").await;
        {
            let pinner = fixture.pinner().await;
            pinner.add_recursive(&a).await.unwrap();
            pinner.add_direct(&b).await.unwrap();
        }

        let pinner = fixture.pinner().await;
        let snapshot = pinner.snapshot();
        assert!(snapshot.is_recursive(&a));
        assert!(snapshot.is_direct(&b));
    }

    #[tokio::test]
    async fn test_commit_removes_superseded_root() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        let a = fixture.raw(b"a").await;
        let b = fixture.raw(b"b").await;

        pinner.add_direct(&a).await.unwrap();
        let first = pinner.internal_blocks().await.unwrap();
        let first_root = *first.last().unwrap();
        pinner.add_direct(&b).await.unwrap();

        assert!(!fixture.blocks.has(&first_root).await.unwrap());
        for cid in pinner.internal_blocks().await.unwrap() {
            assert!(fixture.blocks.has(&cid).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_internal_blocks() {
        let fixture = Fixture::new();
        let pinner = fixture.pinner().await;
        assert_eq!(pinner.internal_blocks().await.unwrap().len(), 1);

        let cid = fixture.raw(b"block").await;
        pinner.add_direct(&cid).await.unwrap();

        let internal = pinner.internal_blocks().await.unwrap();
        assert_eq!(internal.len(), 2);
        for cid in internal {
            assert!(fixture.blocks.has(&cid).await.unwrap());
        }
    }
}
