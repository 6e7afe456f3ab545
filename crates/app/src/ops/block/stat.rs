use clap::Args;
use common::linked_data::{parse_cid, CidError};
use common::repo::RepoError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Stat {
    pub cid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockStatError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    InvalidCid(#[from] CidError),
    #[error("{0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Stat {
    type Error = BlockStatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let cid = parse_cid(&self.cid)?;
        let repo = ctx.repo().await?;
        let stat = repo.block_stat(&cid).await?;
        Ok(format!("Key: {}\nSize: {}", stat.cid, stat.size))
    }
}
