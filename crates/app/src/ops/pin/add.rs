use clap::Args;
use common::repo::RepoError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Add {
    /// CIDs or /ipfs/ paths to pin
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Pin everything the block links to as well
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    pub recursive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PinAddError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to pin: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Add {
    type Error = PinAddError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let repo = ctx.repo().await?;

        let mut lines = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let pin = repo.pin_add(path, self.recursive).await?;
            lines.push(format!("pinned {} {}", pin.cid, pin.reason));
        }
        Ok(lines.join("\n"))
    }
}
