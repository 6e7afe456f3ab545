//! Thin layer over `cid` / `multihash` naming the handful of codecs and
//! hash functions this store understands.
//!
//! Blocks are identified by [`Cid`], but every comparison that decides
//! whether a block lives or dies goes through [`BlockKey`]: the canonical
//! binary multihash. Two CIDs that differ only in version or codec name the
//! same stored bytes and therefore the same key.

mod path;

use std::fmt;
use std::str::FromStr;

use multihash::Multihash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use cid::multibase;
pub use cid::Cid;
pub use ipld_core::ipld::Ipld;
pub use path::IpfsPath;

use multibase::Base;

/// Raw binary codec: blocks carry no links
pub const RAW: u64 = 0x55;
/// DAG-CBOR codec: links are CBOR tag 42
pub const DAG_CBOR: u64 = 0x71;
/// DAG-PB codec, only meaningful here to reject CIDv0 writes
pub const DAG_PB: u64 = 0x70;

/// Identity multihash: the digest is the block itself
pub const IDENTITY: u64 = 0x00;
pub const SHA2_256: u64 = 0x12;
pub const BLAKE3: u64 = 0x1e;

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("invalid cid: {0}")]
    Cid(#[from] cid::Error),
    #[error("invalid multihash: {0}")]
    Multihash(#[from] multihash::Error),
    #[error("invalid block key: {0}")]
    InvalidKey(String),
    #[error("unsupported block format: {0}")]
    UnsupportedFormat(String),
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(String),
    #[error("unsupported cid version {0} for this block format")]
    UnsupportedVersion(u64),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Canonical identity of a stored block: the multihash of its CID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Multihash<64>);

impl BlockKey {
    pub fn multihash(&self) -> &Multihash<64> {
        &self.0
    }

    /// The CID a store reports for a key it only knows by multihash
    pub fn to_cid(&self) -> Cid {
        Cid::new_v1(RAW, self.0)
    }
}

impl From<&Cid> for BlockKey {
    fn from(cid: &Cid) -> Self {
        Self(*cid.hash())
    }
}

impl From<Cid> for BlockKey {
    fn from(cid: Cid) -> Self {
        Self(*cid.hash())
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", multibase::encode(Base::Base32Upper, self.0.to_bytes()))
    }
}

impl FromStr for BlockKey {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, bytes) =
            multibase::decode(s).map_err(|e| CidError::InvalidKey(format!("{}: {}", s, e)))?;
        let hash = Multihash::<64>::from_bytes(&bytes)?;
        Ok(Self(hash))
    }
}

/// Block encodings accepted by `block put`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockFormat {
    #[default]
    Raw,
    DagCbor,
}

impl BlockFormat {
    pub fn codec(&self) -> u64 {
        match self {
            BlockFormat::Raw => RAW,
            BlockFormat::DagCbor => DAG_CBOR,
        }
    }
}

impl FromStr for BlockFormat {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(BlockFormat::Raw),
            "dag-cbor" | "cbor" => Ok(BlockFormat::DagCbor),
            other => Err(CidError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for BlockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockFormat::Raw => write!(f, "raw"),
            BlockFormat::DagCbor => write!(f, "dag-cbor"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlg {
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    Blake3,
}

impl HashAlg {
    pub fn code(&self) -> u64 {
        match self {
            HashAlg::Sha2_256 => SHA2_256,
            HashAlg::Blake3 => BLAKE3,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Result<Multihash<64>, CidError> {
        let hash = match self {
            HashAlg::Sha2_256 => Multihash::wrap(SHA2_256, &Sha256::digest(data))?,
            HashAlg::Blake3 => Multihash::wrap(BLAKE3, blake3::hash(data).as_bytes())?,
        };
        Ok(hash)
    }
}

impl FromStr for HashAlg {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha2-256" | "sha256" => Ok(HashAlg::Sha2_256),
            "blake3" => Ok(HashAlg::Blake3),
            other => Err(CidError::UnsupportedHash(other.to_string())),
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlg::Sha2_256 => write!(f, "sha2-256"),
            HashAlg::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Compute the CID for `data` under the given encoding options.
///
/// CIDv0 is only defined for dag-pb + sha2-256, neither of which this
/// store writes, so only version 1 is accepted.
pub fn cid_for(
    data: &[u8],
    format: BlockFormat,
    hash_alg: HashAlg,
    version: u64,
) -> Result<Cid, CidError> {
    if version != 1 {
        return Err(CidError::UnsupportedVersion(version));
    }
    let hash = hash_alg.digest(data)?;
    Ok(Cid::new_v1(format.codec(), hash))
}

/// Parse a CID from its textual (multibase or base58 v0) form
pub fn parse_cid(s: &str) -> Result<Cid, CidError> {
    Ok(Cid::try_from(s.trim())?)
}
