//! Small key-value store for node bookkeeping that lives outside the
//! block store: the MFS root pointer and the pinner's root pointer.
//!
//! A missing key is the normal "nothing configured yet" state, reported
//! as [`DatastoreError::NotFound`] so callers can tell it apart from I/O
//! failures.

mod fs;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

pub use fs::FsDatastore;
pub use memory::MemoryDatastore;

/// Key holding the CID of the mutable filesystem root
pub const MFS_ROOT_KEY: &str = "/local/filesroot";
/// Key holding the CID of the pinner's persisted root block
pub const PINS_ROOT_KEY: &str = "/local/pins";

#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("datastore key not found: {0}")]
    NotFound(String),
    #[error("invalid datastore key: {0}")]
    InvalidKey(String),
    #[error("datastore i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("datastore error: {0}")]
    Default(#[from] anyhow::Error),
}

impl DatastoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatastoreError::NotFound(_))
    }
}

#[async_trait]
pub trait Datastore: Send + Sync + Debug + 'static {
    async fn get(&self, key: &str) -> Result<Bytes, DatastoreError>;

    async fn put(&self, key: &str, value: Bytes) -> Result<(), DatastoreError>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), DatastoreError>;
}
