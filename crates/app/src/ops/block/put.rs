use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use common::linked_data::{BlockFormat, CidError, HashAlg};
use common::repo::{BlockPutOptions, RepoError};
use tokio::io::AsyncReadExt;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// File to read the block from (defaults to stdin)
    pub file: Option<PathBuf>,

    /// raw or dag-cbor
    #[arg(short, long, default_value = "raw")]
    pub format: String,

    /// sha2-256 or blake3
    #[arg(long, default_value = "sha2-256")]
    pub mhtype: String,

    #[arg(long, default_value_t = 1)]
    pub cid_version: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockPutError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Options(#[from] CidError),
    #[error("failed to store block: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = BlockPutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let options = BlockPutOptions {
            format: self.format.parse::<BlockFormat>()?,
            hash_alg: self.mhtype.parse::<HashAlg>()?,
            cid_version: self.cid_version,
        };

        let data = match &self.file {
            Some(path) => tokio::fs::read(path).await?,
            None => {
                let mut buf = Vec::new();
                tokio::io::stdin().read_to_end(&mut buf).await?;
                buf
            }
        };

        let repo = ctx.repo().await?;
        let block = repo.block_put(Bytes::from(data), options).await?;
        Ok(block.cid.to_string())
    }
}
