use clap::Args;
use common::pin::PinType;
use common::repo::RepoError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Only check these CIDs or /ipfs/ paths
    pub paths: Vec<String>,

    /// direct, recursive, indirect or all
    #[arg(short = 't', long = "type", default_value = "all")]
    pub pin_type: PinType,

    /// Print CIDs only
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PinLsError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("{0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = PinLsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let repo = ctx.repo().await?;

        let paths: Vec<&str> = self.paths.iter().map(String::as_str).collect();
        let filter = (!paths.is_empty()).then_some(paths.as_slice());
        let pins = repo.pin_ls(filter, self.pin_type).await?;

        let output = pins
            .iter()
            .map(|pin| {
                if self.quiet {
                    pin.cid.to_string()
                } else {
                    pin.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(output)
    }
}
