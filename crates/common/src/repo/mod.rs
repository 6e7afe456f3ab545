//! The repository facade.
//!
//! [`Repo`] wires a block store, a datastore, the [`Pinner`](crate::pin::Pinner)
//!  and the [`Collector`](crate::gc::Collector) around one shared
//!  [`GcLock`](crate::lock::GcLock):
//!
//! | operation          | lock      | runs on        |
//! |--------------------|-----------|----------------|
//! | `block_put`        | shared    | caller         |
//! | `set_mfs_root`     | shared    | caller         |
//! | `pin_add/pin_rm`   | exclusive | spawned task   |
//! | `block_rm`         | exclusive | spawned task   |
//! | `gc`               | exclusive | spawned task   |
//! | reads, `pin_ls`    | none      | caller         |
//!
//! Exclusive operations run to completion on their own task once started,
//!  so dropping the caller's future never strands a half-finished sweep.

mod error;
mod repo_inner;

pub use error::RepoError;
pub use repo_inner::{Repo, RepoStatus, BLOCKS_DIR, DATASTORE_DIR};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::linked_data::{BlockFormat, Cid, HashAlg};

/// Encoding options for `block_put`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPutOptions {
    pub format: BlockFormat,
    pub hash_alg: HashAlg,
    pub cid_version: u64,
}

impl Default for BlockPutOptions {
    fn default() -> Self {
        Self {
            format: BlockFormat::Raw,
            hash_alg: HashAlg::Sha2_256,
            cid_version: 1,
        }
    }
}

/// A block as written by `block_put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStat {
    pub cid: Cid,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RmOptions {
    /// Report missing blocks as removed
    pub force: bool,
    /// Drop successful entries from the results
    pub quiet: bool,
}

/// Outcome for one CID in a `block_rm` batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmResult {
    pub cid: Cid,
    pub error: Option<String>,
}

impl RmResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
