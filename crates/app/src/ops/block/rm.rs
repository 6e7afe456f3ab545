use clap::Args;
use common::linked_data::{parse_cid, CidError};
use common::repo::{RepoError, RmOptions};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// CIDs of the blocks to remove
    #[arg(required = true)]
    pub cids: Vec<String>,

    /// Ignore blocks that do not exist
    #[arg(short, long)]
    pub force: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockRmError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    InvalidCid(#[from] CidError),
    #[error("failed to remove blocks: {0}")]
    Repo(#[from] RepoError),
    #[error("{output}\n{failed} block(s) could not be removed")]
    Partial { output: String, failed: usize },
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = BlockRmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let cids = self
            .cids
            .iter()
            .map(|s| parse_cid(s))
            .collect::<Result<Vec<_>, _>>()?;

        let repo = ctx.repo().await?;
        let options = RmOptions {
            force: self.force,
            quiet: self.quiet,
        };
        let results = repo.block_rm(&cids, options).await?;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        let output = results
            .iter()
            .map(|r| match &r.error {
                Some(error) => format!("cannot remove {}: {}", r.cid, error),
                None => format!("removed {}", r.cid),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if failed > 0 {
            return Err(BlockRmError::Partial { output, failed });
        }
        Ok(output)
    }
}
