use std::fmt;
use std::str::FromStr;

use super::{Cid, CidError};

const IPFS_PREFIX: &str = "/ipfs/";

/// A CID, optionally followed by path segments into its DAG.
///
/// Accepts `<cid>`, `/ipfs/<cid>` and `/ipfs/<cid>/a/b`. The original
///  text is kept so errors can name the path the caller gave us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpfsPath {
    root: Cid,
    segments: Vec<String>,
    original: String,
}

impl IpfsPath {
    pub fn root(&self) -> &Cid {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if the path names the root CID with no segments
    pub fn is_bare(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<Cid> for IpfsPath {
    fn from(cid: Cid) -> Self {
        Self {
            root: cid,
            segments: Vec::new(),
            original: cid.to_string(),
        }
    }
}

impl FromStr for IpfsPath {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed.strip_prefix(IPFS_PREFIX).unwrap_or(trimmed);
        if rest.starts_with('/') {
            return Err(CidError::InvalidPath(s.to_string()));
        }

        let mut parts = rest.split('/').filter(|part| !part.is_empty());
        let root = parts
            .next()
            .ok_or_else(|| CidError::InvalidPath(s.to_string()))?;
        let root = Cid::try_from(root)?;
        let segments = parts.map(str::to_string).collect();

        Ok(Self {
            root,
            segments,
            original: trimmed.to_string(),
        })
    }
}

impl fmt::Display for IpfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linked_data::{cid_for, BlockFormat, HashAlg};

    fn test_cid() -> Cid {
        cid_for(b"path root", BlockFormat::DagCbor, HashAlg::Sha2_256, 1).unwrap()
    }

    #[test]
    fn test_parse_bare_cid() {
        let cid = test_cid();
        let path: IpfsPath = cid.to_string().parse().unwrap();
        assert_eq!(path.root(), &cid);
        assert!(path.is_bare());
    }

    #[test]
    fn test_parse_prefixed_with_segments() {
        let cid = test_cid();
        let text = format!("/ipfs/{}/links/0/", cid);
        let path: IpfsPath = text.parse().unwrap();
        assert_eq!(path.root(), &cid);
        assert_eq!(path.segments(), &["links".to_string(), "0".to_string()]);
        assert_eq!(path.to_string(), text);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<IpfsPath>().is_err());
        assert!("/ipfs/".parse::<IpfsPath>().is_err());
        assert!("/ipns/foo".parse::<IpfsPath>().is_err());
        assert!("not-a-cid".parse::<IpfsPath>().is_err());
    }
}
