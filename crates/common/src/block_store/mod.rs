//! Content store abstraction.
//!
//! Blocks are keyed by [`BlockKey`] (the multihash of their CID), so a
//!  block written under a raw CID is found again under a dag-cbor or v0
//!  CID with the same hash. Enumeration reports raw v1 CIDs, the only
//!  thing a key alone can reconstruct.

mod fs;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::linked_data::{BlockKey, Cid};

pub(crate) use fs::write_atomic;
pub use fs::FsBlockStore;
pub use memory::MemoryBlockStore;

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("block not found: {0}")]
    NotFound(Cid),
    #[error("block store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("block store error: {0}")]
    Default(#[from] anyhow::Error),
}

/// One entry from a store enumeration.
///
/// `key` is `None` when the stored name could not be parsed back into a
///  block key; the collector reports those rather than skipping them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    pub name: String,
    pub key: Option<BlockKey>,
}

impl StoredKey {
    pub fn cid(&self) -> Option<Cid> {
        self.key.map(|key| key.to_cid())
    }
}

impl From<BlockKey> for StoredKey {
    fn from(key: BlockKey) -> Self {
        Self {
            name: key.to_string(),
            key: Some(key),
        }
    }
}

#[async_trait]
pub trait BlockStore: Send + Sync + Debug + 'static {
    async fn has(&self, cid: &Cid) -> Result<bool, BlockStoreError>;

    /// Fails with `NotFound` if the block is absent
    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockStoreError>;

    /// Writing a block that is already present is a no-op
    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), BlockStoreError>;

    /// Fails with `NotFound` if the block is absent
    async fn delete(&self, cid: &Cid) -> Result<(), BlockStoreError>;

    /// Enumerate every stored key without reading block contents
    async fn list(&self) -> Result<Vec<StoredKey>, BlockStoreError>;

    /// Size of a stored block in bytes
    async fn size(&self, cid: &Cid) -> Result<usize, BlockStoreError> {
        Ok(self.get(cid).await?.len())
    }
}
