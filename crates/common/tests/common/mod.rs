//! Shared test utilities for repo integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::block_store::StoredKey;
use common::datastore::{Datastore, DatastoreError, MemoryDatastore};
use common::gc::GcConfig;
use common::prelude::*;
use ipld_core::ipld::Ipld;
use tempfile::TempDir;

/// Route library logs to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Repo backed by the filesystem, rooted in a fresh temp dir
pub async fn setup_fs_repo() -> (Repo, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Repo::open_fs(temp_dir.path(), GcConfig::default())
        .await
        .unwrap();
    (repo, temp_dir)
}

pub async fn setup_memory_repo() -> Repo {
    Repo::in_memory().await.unwrap()
}

pub async fn put_raw(repo: &Repo, data: &[u8]) -> Cid {
    repo.block_put(Bytes::copy_from_slice(data), BlockPutOptions::default())
        .await
        .unwrap()
        .cid
}

/// Store a dag-cbor node `{ name, links: [..] }`
pub async fn put_node(repo: &Repo, name: &str, links: &[Cid]) -> Cid {
    let node = Ipld::Map(BTreeMap::from([
        ("name".to_string(), Ipld::String(name.to_string())),
        (
            "links".to_string(),
            Ipld::List(links.iter().copied().map(Ipld::Link).collect()),
        ),
    ]));
    let data = serde_ipld_dagcbor::to_vec(&node).unwrap();
    let options = BlockPutOptions {
        format: BlockFormat::DagCbor,
        ..Default::default()
    };
    repo.block_put(Bytes::from(data), options).await.unwrap().cid
}

/// True if `results` has an entry for `cid`, compared by block key
pub fn swept(results: &[GcResult], cid: &Cid) -> bool {
    let key = BlockKey::from(cid);
    results
        .iter()
        .any(|r| r.cid.map(BlockKey::from) == Some(key))
}

/// Datastore that fails reads of one key with an I/O error
#[derive(Debug, Default)]
pub struct FailingDatastore {
    inner: MemoryDatastore,
    fail_key: String,
}

impl FailingDatastore {
    pub fn new(fail_key: &str) -> Self {
        Self {
            inner: MemoryDatastore::new(),
            fail_key: fail_key.to_string(),
        }
    }
}

#[async_trait]
impl Datastore for FailingDatastore {
    async fn get(&self, key: &str) -> Result<Bytes, DatastoreError> {
        if key == self.fail_key {
            return Err(DatastoreError::Io(std::io::Error::other("injected failure")));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), DatastoreError> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), DatastoreError> {
        self.inner.delete(key).await
    }
}

pub async fn setup_failing_repo(fail_key: &str) -> (Repo, Arc<MemoryBlockStore>) {
    let blocks = Arc::new(MemoryBlockStore::new());
    let repo = Repo::open(
        blocks.clone(),
        Arc::new(FailingDatastore::new(fail_key)),
        GcConfig::default(),
    )
    .await
    .unwrap();
    (repo, blocks)
}

/// Block store whose deletes sleep and record the peak number in flight
#[derive(Debug, Default)]
pub struct CountingBlockStore {
    inner: MemoryBlockStore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for CountingBlockStore {
    async fn has(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        self.inner.has(cid).await
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        self.inner.get(cid).await
    }

    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), BlockStoreError> {
        self.inner.put(cid, data).await
    }

    async fn delete(&self, cid: &Cid) -> Result<(), BlockStoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = self.inner.delete(cid).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list(&self) -> Result<Vec<StoredKey>, BlockStoreError> {
        self.inner.list().await
    }
}
