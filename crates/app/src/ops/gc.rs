use clap::Args;
use common::repo::RepoError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Gc {
    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("gc failed: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Gc {
    type Error = GcError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let repo = ctx.repo().await?;
        let results = repo.gc().await?;

        let output = results
            .iter()
            .filter_map(|result| match (&result.error, &result.cid) {
                (Some(error), _) => Some(format!("error: {}: {}", result.name, error)),
                (None, Some(cid)) if !self.quiet => Some(format!("removed {}", cid)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(output)
    }
}
