use clap::Args;
use common::repo::RepoError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// CIDs or /ipfs/ paths to unpin
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove a recursive pin rather than a direct one
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    pub recursive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PinRmError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to unpin: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = PinRmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let repo = ctx.repo().await?;

        let mut lines = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let pin = repo.pin_rm(path, self.recursive).await?;
            lines.push(format!("unpinned {}", pin.cid));
        }
        Ok(lines.join("\n"))
    }
}
