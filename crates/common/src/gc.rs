//! Mark-and-sweep collection.
//!
//! A cycle holds the [`GcLock`] exclusively from before marking until the
//!  last delete returns, so no block can be written or unpinned between
//!  deciding it is garbage and removing it.
//!
//! ```text
//! Idle --lock--> Marking --marked set--> Sweeping --results--> Idle
//!                   |
//!                   +--source error (not NotFound)--> Idle, nothing deleted
//! ```
//!
//! Marking pulls from four independent sources. Each yields either a set
//!  of block keys or an error; a "key not found" error means the source
//!  has nothing configured yet and contributes an empty set, anything
//!  else aborts the cycle before a single delete is issued.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::block_store::{BlockStore, BlockStoreError, StoredKey};
use crate::dag::{DagError, DagWalker};
use crate::datastore::{Datastore, DatastoreError};
use crate::linked_data::{BlockKey, Cid};
use crate::lock::GcLock;
use crate::mfs;
use crate::pin::{reachability, PinError, Pinner};

pub const DEFAULT_DELETE_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Upper bound on deletes in flight during a sweep
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,
}

fn default_delete_concurrency() -> usize {
    DEFAULT_DELETE_CONCURRENCY
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            delete_concurrency: default_delete_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Marking,
    Sweeping,
}

/// Outcome for one unreferenced key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcResult {
    /// Name of the key as the store reported it
    pub name: String,
    /// `None` when the stored name did not parse
    pub cid: Option<Cid>,
    pub error: Option<String>,
}

impl GcResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Contributors to the marked set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkSource {
    PinnerInternal,
    DirectPins,
    RecursivePins,
    MfsRoot,
}

impl fmt::Display for MarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarkSource::PinnerInternal => "pinner internal blocks",
            MarkSource::DirectPins => "direct pins",
            MarkSource::RecursivePins => "recursive pins",
            MarkSource::MfsRoot => "mfs root",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MarkError {
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
    #[error(transparent)]
    Pin(#[from] PinError),
    #[error(transparent)]
    Dag(#[from] DagError),
}

impl MarkError {
    /// Only a missing datastore key counts as "nothing configured"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MarkError::Datastore(DatastoreError::NotFound(_))
                | MarkError::Pin(PinError::Datastore(DatastoreError::NotFound(_)))
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("failed to enumerate stored blocks: {0}")]
    Enumerate(#[from] BlockStoreError),
    #[error("failed to mark {origin}: {error}")]
    Mark { origin: MarkSource, error: MarkError },
}

pub type MarkOutcome = (MarkSource, Result<HashSet<BlockKey>, MarkError>);

/// Union the per-source results, treating `NotFound` as empty and
///  failing on the first other error.
pub fn merge_marks(outcomes: Vec<MarkOutcome>) -> Result<HashSet<BlockKey>, GcError> {
    let mut marked = HashSet::new();
    for (origin, outcome) in outcomes {
        match outcome {
            Ok(keys) => marked.extend(keys),
            Err(error) if error.is_not_found() => {
                tracing::debug!(source = %origin, "mark source not configured, treating as empty");
            }
            Err(error) => return Err(GcError::Mark { origin, error }),
        }
    }
    Ok(marked)
}

#[derive(Debug)]
pub struct Collector {
    lock: GcLock,
    blocks: Arc<dyn BlockStore>,
    datastore: Arc<dyn Datastore>,
    pinner: Arc<Pinner>,
    walker: Arc<dyn DagWalker>,
    config: GcConfig,
    phase: Mutex<GcPhase>,
}

impl Collector {
    pub fn new(
        lock: GcLock,
        blocks: Arc<dyn BlockStore>,
        datastore: Arc<dyn Datastore>,
        pinner: Arc<Pinner>,
        walker: Arc<dyn DagWalker>,
        config: GcConfig,
    ) -> Self {
        Self {
            lock,
            blocks,
            datastore,
            pinner,
            walker,
            config,
            phase: Mutex::new(GcPhase::Idle),
        }
    }

    pub fn phase(&self) -> GcPhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: GcPhase) {
        *self.phase.lock() = phase;
    }

    /// Run one full cycle, returning a result for every unreferenced key
    pub async fn collect(&self) -> Result<Vec<GcResult>, GcError> {
        let guard = self.lock.write().await;
        let result = self.cycle().await;
        self.set_phase(GcPhase::Idle);
        guard.release();
        result
    }

    async fn cycle(&self) -> Result<Vec<GcResult>, GcError> {
        self.set_phase(GcPhase::Marking);
        let (stored, marked) = tokio::join!(self.blocks.list(), self.mark());
        let stored = stored?;
        let marked = marked?;

        let total = stored.len();
        let unreferenced: Vec<StoredKey> = stored
            .into_iter()
            .filter(|stored| match &stored.key {
                Some(key) => !marked.contains(key),
                None => true,
            })
            .collect();
        tracing::info!(
            stored = total,
            marked = marked.len(),
            unreferenced = unreferenced.len(),
            "gc mark phase complete"
        );

        self.set_phase(GcPhase::Sweeping);
        let concurrency = self.config.delete_concurrency.max(1);
        let results: Vec<GcResult> = stream::iter(unreferenced)
            .map(|stored| self.sweep_one(stored))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        tracing::info!(
            removed = results.len() - failed,
            failed = failed,
            "gc sweep phase complete"
        );
        Ok(results)
    }

    async fn mark(&self) -> Result<HashSet<BlockKey>, GcError> {
        let snapshot = self.pinner.snapshot();
        let walker = self.walker.as_ref();

        let (internal, recursive, mfs_root) = tokio::join!(
            async {
                self.pinner
                    .internal_blocks()
                    .await
                    .map(|cids| cids.iter().map(BlockKey::from).collect::<HashSet<_>>())
                    .map_err(MarkError::from)
            },
            async {
                reachability::recursive_closure(&snapshot, walker)
                    .await
                    .map_err(MarkError::from)
            },
            self.mark_mfs(),
        );
        let direct: HashSet<BlockKey> = snapshot.direct().map(BlockKey::from).collect();

        merge_marks(vec![
            (MarkSource::PinnerInternal, internal),
            (MarkSource::DirectPins, Ok(direct)),
            (MarkSource::RecursivePins, recursive),
            (MarkSource::MfsRoot, mfs_root),
        ])
    }

    async fn mark_mfs(&self) -> Result<HashSet<BlockKey>, MarkError> {
        let root = mfs::root(self.datastore.as_ref()).await?;
        let mut keys: HashSet<BlockKey> = self
            .walker
            .descendants(&root)
            .await?
            .iter()
            .map(BlockKey::from)
            .collect();
        keys.insert(BlockKey::from(&root));
        Ok(keys)
    }

    async fn sweep_one(&self, stored: StoredKey) -> GcResult {
        let Some(cid) = stored.cid() else {
            tracing::warn!(name = %stored.name, "skipping unparseable block key");
            return GcResult {
                error: Some(format!("invalid block key: {}", stored.name)),
                name: stored.name,
                cid: None,
            };
        };

        match self.blocks.delete(&cid).await {
            Ok(()) => {
                tracing::debug!(cid = %cid, "removed unreferenced block");
                GcResult {
                    name: stored.name,
                    cid: Some(cid),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "failed to remove block");
                GcResult {
                    name: stored.name,
                    cid: Some(cid),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linked_data::{cid_for, BlockFormat, HashAlg};

    fn key(data: &[u8]) -> BlockKey {
        BlockKey::from(cid_for(data, BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap())
    }

    #[test]
    fn test_merge_unions_sources() {
        let marked = merge_marks(vec![
            (MarkSource::DirectPins, Ok(HashSet::from([key(b"a")]))),
            (MarkSource::RecursivePins, Ok(HashSet::from([key(b"a"), key(b"b")]))),
        ])
        .unwrap();
        assert_eq!(marked.len(), 2);
    }

    #[test]
    fn test_merge_treats_not_found_as_empty() {
        let marked = merge_marks(vec![
            (MarkSource::DirectPins, Ok(HashSet::from([key(b"a")]))),
            (
                MarkSource::MfsRoot,
                Err(DatastoreError::NotFound("/local/filesroot".into()).into()),
            ),
            (
                MarkSource::PinnerInternal,
                Err(PinError::Datastore(DatastoreError::NotFound("/local/pins".into())).into()),
            ),
        ])
        .unwrap();
        assert_eq!(marked, HashSet::from([key(b"a")]));
    }

    #[test]
    fn test_merge_aborts_on_other_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let result = merge_marks(vec![
            (MarkSource::DirectPins, Ok(HashSet::from([key(b"a")]))),
            (MarkSource::MfsRoot, Err(DatastoreError::Io(io).into())),
        ]);
        assert!(matches!(
            result,
            Err(GcError::Mark {
                origin: MarkSource::MfsRoot,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_block_is_not_treated_as_not_found() {
        let cid = cid_for(b"gone", BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap();
        let error = MarkError::from(DagError::NotFound(cid));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(
            GcConfig::default().delete_concurrency,
            DEFAULT_DELETE_CONCURRENCY
        );
    }
}
