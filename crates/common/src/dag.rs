//! Link traversal over blocks.
//!
//! The walker only needs to know where a block's links are; it never
//!  interprets the data beyond that. `raw` blocks have no links,
//!  `dag-cbor` blocks link through CBOR tag 42. Anything else is refused
//!  rather than treated as a leaf, since a leaf we failed to understand
//!  would leave its children unmarked.

use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::block_store::{BlockStore, BlockStoreError};
use crate::linked_data::{Cid, IpfsPath, Ipld, DAG_CBOR, IDENTITY, RAW};

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("block not found: {0}")]
    NotFound(Cid),
    #[error("unsupported codec 0x{codec:x} for {cid}")]
    UnsupportedCodec { cid: Cid, codec: u64 },
    #[error("failed to decode {cid}: {reason}")]
    Decode { cid: Cid, reason: String },
    #[error("no link named '{segment}' in path {path}")]
    PathNotFound { path: String, segment: String },
    #[error("path {0} does not resolve to a link")]
    NotALink(String),
    #[error("block store error: {0}")]
    Store(BlockStoreError),
}

impl From<BlockStoreError> for DagError {
    fn from(err: BlockStoreError) -> Self {
        match err {
            BlockStoreError::NotFound(cid) => DagError::NotFound(cid),
            other => DagError::Store(other),
        }
    }
}

/// Decode a block into its IPLD data model form
pub fn decode_block(cid: &Cid, data: &[u8]) -> Result<Ipld, DagError> {
    match cid.codec() {
        RAW => Ok(Ipld::Bytes(data.to_vec())),
        DAG_CBOR => serde_ipld_dagcbor::from_slice::<Ipld>(data).map_err(|e| DagError::Decode {
            cid: *cid,
            reason: e.to_string(),
        }),
        codec => Err(DagError::UnsupportedCodec { cid: *cid, codec }),
    }
}

/// Collect every link in `node`, in document order
pub fn collect_links(node: &Ipld, out: &mut Vec<Cid>) {
    match node {
        Ipld::Link(cid) => out.push(*cid),
        Ipld::List(items) => items.iter().for_each(|item| collect_links(item, out)),
        Ipld::Map(map) => map.values().for_each(|value| collect_links(value, out)),
        _ => {}
    }
}

#[async_trait]
pub trait DagWalker: Send + Sync + Debug + 'static {
    /// Load and decode a single block.
    ///
    /// Fails with `NotFound` if the block cannot be dereferenced.
    async fn node(&self, cid: &Cid) -> Result<Ipld, DagError>;

    /// Direct links of a block
    async fn links(&self, cid: &Cid) -> Result<Vec<Cid>, DagError> {
        let node = self.node(cid).await?;
        let mut links = Vec::new();
        collect_links(&node, &mut links);
        Ok(links)
    }

    /// Every block transitively reachable from `cid`, excluding `cid`.
    ///
    /// Breadth-first, each CID once, so the order is stable for a fixed
    ///  DAG. Visits are keyed by the full CID: the same bytes linked as
    ///  `raw` and as `dag-cbor` decode differently, and only the latter
    ///  has links to follow.
    async fn descendants(&self, cid: &Cid) -> Result<Vec<Cid>, DagError> {
        let mut seen: HashSet<Cid> = HashSet::from([*cid]);
        let mut queue: VecDeque<Cid> = VecDeque::from([*cid]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            for link in self.links(&current).await? {
                if seen.insert(link) {
                    out.push(link);
                    queue.push_back(link);
                }
            }
        }

        Ok(out)
    }

    /// Follow a path's segments through maps (by key) and lists (by
    ///  index) until each lands on a link.
    async fn resolve(&self, path: &IpfsPath) -> Result<Cid, DagError> {
        let mut cid = *path.root();
        let mut pending: Option<Ipld> = None;

        for segment in path.segments() {
            let current = match pending.take() {
                Some(node) => node,
                None => self.node(&cid).await?,
            };
            let next = match &current {
                Ipld::Map(map) => map.get(segment).cloned(),
                Ipld::List(list) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| list.get(idx).cloned()),
                _ => None,
            }
            .ok_or_else(|| DagError::PathNotFound {
                path: path.to_string(),
                segment: segment.clone(),
            })?;

            match next {
                Ipld::Link(link) => cid = link,
                other => pending = Some(other),
            }
        }

        if pending.is_some() {
            return Err(DagError::NotALink(path.to_string()));
        }
        Ok(cid)
    }
}

/// Walker reading blocks straight out of a [`BlockStore`]
#[derive(Debug, Clone)]
pub struct BlockDagWalker {
    blocks: Arc<dyn BlockStore>,
}

impl BlockDagWalker {
    pub fn new(blocks: Arc<dyn BlockStore>) -> Self {
        Self { blocks }
    }
}

#[async_trait]
impl DagWalker for BlockDagWalker {
    async fn node(&self, cid: &Cid) -> Result<Ipld, DagError> {
        let data = if cid.hash().code() == IDENTITY {
            Bytes::copy_from_slice(cid.hash().digest())
        } else {
            self.blocks.get(cid).await?
        };
        decode_block(cid, &data)
    }
}
