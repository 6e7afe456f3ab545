use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{BlockStore, BlockStoreError, StoredKey};
use crate::linked_data::{BlockKey, Cid};

/// In-memory block store using a HashMap
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    inner: Arc<RwLock<HashMap<BlockKey, Bytes>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn has(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        Ok(self.inner.read().contains_key(&BlockKey::from(cid)))
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        self.inner
            .read()
            .get(&BlockKey::from(cid))
            .cloned()
            .ok_or(BlockStoreError::NotFound(*cid))
    }

    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), BlockStoreError> {
        self.inner
            .write()
            .entry(BlockKey::from(cid))
            .or_insert(data);
        Ok(())
    }

    async fn delete(&self, cid: &Cid) -> Result<(), BlockStoreError> {
        self.inner
            .write()
            .remove(&BlockKey::from(cid))
            .map(|_| ())
            .ok_or(BlockStoreError::NotFound(*cid))
    }

    async fn list(&self) -> Result<Vec<StoredKey>, BlockStoreError> {
        Ok(self
            .inner
            .read()
            .keys()
            .copied()
            .map(StoredKey::from)
            .collect())
    }

    async fn size(&self, cid: &Cid) -> Result<usize, BlockStoreError> {
        self.inner
            .read()
            .get(&BlockKey::from(cid))
            .map(Bytes::len)
            .ok_or(BlockStoreError::NotFound(*cid))
    }
}
