use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use super::{Block, BlockPutOptions, BlockStat, RepoError, RmOptions, RmResult};
use crate::block_store::{BlockStore, BlockStoreError, FsBlockStore, MemoryBlockStore};
use crate::dag::{decode_block, BlockDagWalker, DagWalker};
use crate::datastore::{Datastore, FsDatastore, MemoryDatastore};
use crate::gc::{Collector, GcConfig, GcPhase, GcResult};
use crate::linked_data::{cid_for, BlockFormat, BlockKey, Cid, IpfsPath};
use crate::lock::GcLock;
use crate::mfs;
use crate::pin::{Pin, PinType, Pinner};

/// Block storage directory inside a filesystem repo
pub const BLOCKS_DIR: &str = "blocks";
/// Datastore directory inside a filesystem repo
pub const DATASTORE_DIR: &str = "datastore";

#[derive(Debug)]
struct RepoInner {
    blocks: Arc<dyn BlockStore>,
    datastore: Arc<dyn Datastore>,
    walker: Arc<dyn DagWalker>,
    lock: GcLock,
    pinner: Arc<Pinner>,
    collector: Collector,
}

/// Cheap handle onto a repository; clones share all state
#[derive(Debug, Clone)]
pub struct Repo(Arc<RepoInner>);

/// Point-in-time view of the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoStatus {
    pub phase: GcPhase,
    /// Some operation currently holds the lock, shared or exclusive
    pub busy: bool,
}

impl Repo {
    pub async fn open(
        blocks: Arc<dyn BlockStore>,
        datastore: Arc<dyn Datastore>,
        config: GcConfig,
    ) -> Result<Self, RepoError> {
        let walker: Arc<dyn DagWalker> = Arc::new(BlockDagWalker::new(blocks.clone()));
        let pinner = Arc::new(Pinner::load(blocks.clone(), datastore.clone(), walker.clone()).await?);
        let lock = GcLock::new();
        let collector = Collector::new(
            lock.clone(),
            blocks.clone(),
            datastore.clone(),
            pinner.clone(),
            walker.clone(),
            config,
        );

        Ok(Self(Arc::new(RepoInner {
            blocks,
            datastore,
            walker,
            lock,
            pinner,
            collector,
        })))
    }

    pub async fn in_memory() -> Result<Self, RepoError> {
        Self::open(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryDatastore::new()),
            GcConfig::default(),
        )
        .await
    }

    /// Open (creating if needed) a repo laid out under `path`
    pub async fn open_fs(path: &Path, config: GcConfig) -> Result<Self, RepoError> {
        let blocks = FsBlockStore::open(&path.join(BLOCKS_DIR)).await?;
        let datastore = FsDatastore::open(&path.join(DATASTORE_DIR)).await?;
        tracing::debug!(path = %path.display(), "opened filesystem repo");
        Self::open(Arc::new(blocks), Arc::new(datastore), config).await
    }

    pub fn lock(&self) -> &GcLock {
        &self.0.lock
    }

    pub fn blocks(&self) -> Arc<dyn BlockStore> {
        self.0.blocks.clone()
    }

    pub fn pinner(&self) -> &Pinner {
        &self.0.pinner
    }

    pub fn status(&self) -> RepoStatus {
        RepoStatus {
            phase: self.0.collector.phase(),
            busy: self.0.lock.try_write().is_none(),
        }
    }

    /// Run `op` on its own task so it finishes even if the caller's future
    ///  is dropped.
    async fn detached<T, F, Fut>(&self, op: F) -> Result<T, RepoError>
    where
        F: FnOnce(Repo) -> Fut,
        Fut: Future<Output = Result<T, RepoError>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(op(self.clone())).await?
    }

    /* Pins */

    pub async fn pin_add(&self, path: &str, recursive: bool) -> Result<Pin, RepoError> {
        let path: IpfsPath = path.parse()?;
        self.detached(move |repo| async move {
            let guard = repo.0.lock.write().await;
            let cid = repo.0.walker.resolve(&path).await?;
            let pin = if recursive {
                repo.0.pinner.add_recursive(&cid).await?
            } else {
                repo.0.pinner.add_direct(&cid).await?
            };
            guard.release();
            Ok(pin)
        })
        .await
    }

    pub async fn pin_rm(&self, path: &str, recursive: bool) -> Result<Pin, RepoError> {
        let path: IpfsPath = path.parse()?;
        self.detached(move |repo| async move {
            let guard = repo.0.lock.write().await;
            let cid = repo.0.walker.resolve(&path).await?;
            let removed = if recursive {
                repo.0.pinner.remove_recursive(&cid).await
            } else {
                repo.0.pinner.remove_direct(&cid).await
            };
            guard.release();
            removed.map_err(|e| match RepoError::from(e) {
                RepoError::NotPinned(_) => RepoError::NotPinned(path.to_string()),
                other => other,
            })
        })
        .await
    }

    /// List pins of `pin_type`, or check each of `paths` against it.
    ///
    /// With explicit paths every entry must be pinned with a matching
    ///  type; the first one that is not fails the whole call.
    pub async fn pin_ls(
        &self,
        paths: Option<&[&str]>,
        pin_type: PinType,
    ) -> Result<Vec<Pin>, RepoError> {
        let Some(paths) = paths else {
            return Ok(self.0.pinner.ls(pin_type).await?);
        };

        let paths = paths
            .iter()
            .map(|p| p.parse::<IpfsPath>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut pins = Vec::with_capacity(paths.len());
        for path in paths {
            let cid = self.0.walker.resolve(&path).await?;
            let status = self.0.pinner.pinned_with_type(&cid, pin_type).await?;
            match status.reason {
                Some(reason) => pins.push(Pin { cid, reason }),
                None => return Err(RepoError::NotPinned(path.to_string())),
            }
        }
        Ok(pins)
    }

    /* Blocks */

    pub async fn block_put(
        &self,
        data: Bytes,
        options: BlockPutOptions,
    ) -> Result<Block, RepoError> {
        let cid = cid_for(&data, options.format, options.hash_alg, options.cid_version)?;
        if options.format == BlockFormat::DagCbor {
            decode_block(&cid, &data)?;
        }

        let guard = self.0.lock.read().await;
        self.0.blocks.put(&cid, data.clone()).await?;
        guard.release();

        tracing::debug!(cid = %cid, size = data.len(), "block stored");
        Ok(Block { cid, data })
    }

    pub async fn block_get(&self, cid: &Cid) -> Result<Bytes, RepoError> {
        Ok(self.0.blocks.get(cid).await?)
    }

    pub async fn block_stat(&self, cid: &Cid) -> Result<BlockStat, RepoError> {
        let size = self.0.blocks.size(cid).await?;
        Ok(BlockStat { cid: *cid, size })
    }

    /// Remove each of `cids`, never aborting the batch on one failure.
    ///
    /// A pinned block is refused even with `force`; `force` only turns a
    ///  missing block into a reported success.
    pub async fn block_rm(
        &self,
        cids: &[Cid],
        options: RmOptions,
    ) -> Result<Vec<RmResult>, RepoError> {
        let cids = cids.to_vec();
        self.detached(move |repo| async move {
            let guard = repo.0.lock.write().await;
            let mut results = Vec::with_capacity(cids.len());
            for cid in cids {
                let error = repo.remove_block(&cid, options.force).await.err();
                if let Some(error) = &error {
                    tracing::debug!(cid = %cid, error = %error, "block not removed");
                }
                let result = RmResult {
                    cid,
                    error: error.map(|e| e.to_string()),
                };
                if !(options.quiet && result.is_ok()) {
                    results.push(result);
                }
            }
            guard.release();
            Ok(results)
        })
        .await
    }

    async fn remove_block(&self, cid: &Cid, force: bool) -> Result<(), RepoError> {
        let key = BlockKey::from(cid);
        let internal = self.0.pinner.internal_blocks().await?;
        if internal.iter().any(|c| BlockKey::from(c) == key) {
            return Err(RepoError::Protected {
                cid: *cid,
                holder: "pin bookkeeping",
            });
        }
        if let Some(root) = self.mfs_root().await? {
            if BlockKey::from(&root) == key {
                return Err(RepoError::Protected {
                    cid: *cid,
                    holder: "mfs root",
                });
            }
        }

        let status = self.0.pinner.pinned_with_type(cid, PinType::All).await?;
        if let Some(reason) = status.reason {
            return Err(RepoError::Pinned { cid: *cid, reason });
        }

        match self.0.blocks.delete(cid).await {
            Ok(()) => {
                tracing::info!(cid = %cid, "removed block");
                Ok(())
            }
            Err(BlockStoreError::NotFound(_)) if force => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /* Collection */

    pub async fn gc(&self) -> Result<Vec<GcResult>, RepoError> {
        self.detached(|repo| async move { Ok(repo.0.collector.collect().await?) })
            .await
    }

    /* MFS */

    /// Current MFS root, `None` if none has been set
    pub async fn mfs_root(&self) -> Result<Option<Cid>, RepoError> {
        match mfs::root(self.0.datastore.as_ref()).await {
            Ok(cid) => Ok(Some(cid)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_mfs_root(&self, cid: &Cid) -> Result<(), RepoError> {
        let guard = self.0.lock.read().await;
        mfs::set_root(self.0.datastore.as_ref(), cid).await?;
        guard.release();
        tracing::info!(cid = %cid, "mfs root updated");
        Ok(())
    }
}
