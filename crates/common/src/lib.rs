/**
 * Content store abstraction and its
 *  in-memory and filesystem implementations.
 */
pub mod block_store;
/**
 * Link extraction and DAG traversal over
 *  stored blocks.
 */
pub mod dag;
/**
 * Small key-value store for the handful of
 *  pointers (pin root, MFS root) the repo keeps.
 */
pub mod datastore;
/**
 * Mark-and-sweep garbage collection.
 */
pub mod gc;
/**
 * Thin wrapper around CIDs and IPLD, plus the
 *  block key used to compare CIDs by content.
 */
pub mod linked_data;
/**
 * Reader/writer lock that serializes collection
 *  against block mutation.
 */
pub mod lock;
pub mod mfs;
/**
 * Direct, recursive and indirect pins.
 */
pub mod pin;
/**
 * Facade tying the stores, pinner and collector
 *  together behind one lock.
 */
pub mod repo;

pub mod prelude {
    pub use crate::block_store::{BlockStore, BlockStoreError, FsBlockStore, MemoryBlockStore};
    pub use crate::datastore::{Datastore, DatastoreError, FsDatastore, MemoryDatastore};
    pub use crate::gc::{GcConfig, GcPhase, GcResult};
    pub use crate::linked_data::{
        multibase, BlockFormat, BlockKey, Cid, CidError, HashAlg, IpfsPath,
    };
    pub use crate::pin::{Pin, PinReason, PinStatus, PinType};
    pub use crate::repo::{
        Block, BlockPutOptions, BlockStat, Repo, RepoError, RmOptions, RmResult,
    };
}
