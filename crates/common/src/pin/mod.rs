//! Pin bookkeeping.
//!
//! - **[`PinSnapshot`]**: immutable copy of the direct and recursive sets
//! - **[`reachability`]**: pure queries over a snapshot plus a DAG walker
//! - **[`Pinner`]**: owns the live sets and persists them as a DAG-CBOR
//!   block referenced from the datastore
//!
//! Only direct and recursive pins are stored. A block is *indirectly*
//!  pinned when some recursive pin reaches it and it is not itself pinned;
//!  that classification is recomputed on every query.

mod pinner;
pub mod reachability;
mod snapshot;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::block_store::BlockStoreError;
use crate::dag::DagError;
use crate::datastore::DatastoreError;
use crate::linked_data::Cid;

pub use pinner::Pinner;
pub use snapshot::PinSnapshot;

/// The two kinds of pin that are actually recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    Direct,
    Recursive,
}

impl From<PinKind> for PinType {
    fn from(kind: PinKind) -> Self {
        match kind {
            PinKind::Direct => PinType::Direct,
            PinKind::Recursive => PinType::Recursive,
        }
    }
}

/// Query filter for pin lookups and listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Direct,
    Recursive,
    Indirect,
    #[default]
    All,
}

impl PinType {
    pub fn includes_direct(&self) -> bool {
        matches!(self, PinType::Direct | PinType::All)
    }

    pub fn includes_recursive(&self) -> bool {
        matches!(self, PinType::Recursive | PinType::All)
    }

    pub fn includes_indirect(&self) -> bool {
        matches!(self, PinType::Indirect | PinType::All)
    }
}

impl FromStr for PinType {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(PinType::Direct),
            "recursive" => Ok(PinType::Recursive),
            "indirect" => Ok(PinType::Indirect),
            "all" => Ok(PinType::All),
            other => Err(PinError::InvalidType(other.to_string())),
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PinType::Direct => "direct",
            PinType::Recursive => "recursive",
            PinType::Indirect => "indirect",
            PinType::All => "all",
        };
        write!(f, "{}", s)
    }
}

/// Why a block is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinReason {
    Direct,
    Recursive,
    /// Reachable from the recursive pin `via`
    Indirect { via: Cid },
}

impl PinReason {
    pub fn pin_type(&self) -> PinType {
        match self {
            PinReason::Direct => PinType::Direct,
            PinReason::Recursive => PinType::Recursive,
            PinReason::Indirect { .. } => PinType::Indirect,
        }
    }
}

impl fmt::Display for PinReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinReason::Direct => write!(f, "direct"),
            PinReason::Recursive => write!(f, "recursive"),
            PinReason::Indirect { via } => write!(f, "indirect through {}", via),
        }
    }
}

/// A pinned CID together with how it is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    pub cid: Cid,
    pub reason: PinReason,
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cid, self.reason)
    }
}

/// Outcome of a single pin lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStatus {
    pub cid: Cid,
    pub reason: Option<PinReason>,
}

impl PinStatus {
    pub fn is_pinned(&self) -> bool {
        self.reason.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("{0} is not pinned")]
    NotPinned(Cid),
    #[error("{0} already pinned recursively")]
    AlreadyPinnedRecursively(Cid),
    #[error("block not found: {0}")]
    NotFound(Cid),
    #[error("invalid pin type: {0}")]
    InvalidType(String),
    #[error("corrupt pin state: {0}")]
    Corrupt(String),
    #[error("dag error: {0}")]
    Dag(DagError),
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("datastore error: {0}")]
    Datastore(#[from] DatastoreError),
}

impl From<DagError> for PinError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::NotFound(cid) => PinError::NotFound(cid),
            other => PinError::Dag(other),
        }
    }
}
