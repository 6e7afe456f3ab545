use crate::block_store::BlockStoreError;
use crate::dag::DagError;
use crate::datastore::DatastoreError;
use crate::gc::GcError;
use crate::linked_data::{Cid, CidError};
use crate::pin::{PinError, PinReason};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("invalid cid: {0}")]
    InvalidCid(#[from] CidError),
    #[error("block not found: {0}")]
    NotFound(Cid),
    #[error("path {0} is not pinned")]
    NotPinned(String),
    #[error("pinned: {reason}")]
    Pinned { cid: Cid, reason: PinReason },
    /// Block is repo bookkeeping rather than user data
    #[error("protected: {holder}")]
    Protected { cid: Cid, holder: &'static str },
    #[error("{0} already pinned recursively")]
    AlreadyPinnedRecursively(Cid),
    #[error("unsupported codec {codec:#x} for {cid}")]
    UnsupportedCodec { cid: Cid, codec: u64 },
    #[error("block store error: {0}")]
    Store(BlockStoreError),
    #[error("datastore error: {0}")]
    Datastore(#[from] DatastoreError),
    #[error("dag error: {0}")]
    Dag(DagError),
    #[error("pin error: {0}")]
    Pin(PinError),
    #[error("gc error: {0}")]
    Gc(#[from] GcError),
    /// Reserved for provide-style features that live outside this crate
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<BlockStoreError> for RepoError {
    fn from(err: BlockStoreError) -> Self {
        match err {
            BlockStoreError::NotFound(cid) => RepoError::NotFound(cid),
            other => RepoError::Store(other),
        }
    }
}

impl From<DagError> for RepoError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::NotFound(cid) => RepoError::NotFound(cid),
            DagError::UnsupportedCodec { cid, codec } => RepoError::UnsupportedCodec { cid, codec },
            DagError::Store(store) => store.into(),
            other => RepoError::Dag(other),
        }
    }
}

impl From<PinError> for RepoError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::NotPinned(cid) => RepoError::NotPinned(cid.to_string()),
            PinError::AlreadyPinnedRecursively(cid) => RepoError::AlreadyPinnedRecursively(cid),
            PinError::NotFound(cid) => RepoError::NotFound(cid),
            PinError::Dag(dag) => dag.into(),
            PinError::Store(store) => store.into(),
            PinError::Datastore(ds) => RepoError::Datastore(ds),
            other => RepoError::Pin(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linked_data::{cid_for, BlockFormat, HashAlg, DAG_PB};

    fn cid() -> Cid {
        cid_for(b"x", BlockFormat::Raw, HashAlg::Sha2_256, 1).unwrap()
    }

    #[test]
    fn test_not_found_flattens() {
        let cid = cid();
        assert!(matches!(
            RepoError::from(PinError::Dag(DagError::Store(BlockStoreError::NotFound(cid)))),
            RepoError::NotFound(c) if c == cid
        ));
        assert!(matches!(
            RepoError::from(DagError::NotFound(cid)),
            RepoError::NotFound(_)
        ));
    }

    #[test]
    fn test_unsupported_codec() {
        let err = RepoError::from(DagError::UnsupportedCodec {
            cid: cid(),
            codec: DAG_PB,
        });
        assert!(matches!(err, RepoError::UnsupportedCodec { codec: DAG_PB, .. }));
    }

    #[test]
    fn test_pinned_message_names_reason() {
        let via = cid();
        let err = RepoError::Pinned {
            cid: via,
            reason: PinReason::Indirect { via },
        };
        assert_eq!(err.to_string(), format!("pinned: indirect through {}", via));
    }
}
