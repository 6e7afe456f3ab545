use std::path::PathBuf;

use clap::Args;
use common::gc::{GcConfig, DEFAULT_DELETE_CONCURRENCY};
use common::repo::RepoError;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Also write daily-rolling log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Maximum deletes in flight during a gc sweep
    #[arg(long, default_value_t = DEFAULT_DELETE_CONCURRENCY)]
    pub delete_concurrency: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("failed to open new repo: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            gc: GcConfig {
                delete_concurrency: self.delete_concurrency,
            },
        };

        let state = AppState::init(ctx.repo_path.clone(), Some(config))?;
        // writes the pinner's bookkeeping blocks
        state.open_repo().await?;

        let output = format!(
            "Initialized pinstore repo at: {}\n\
             - Blocks: {}\n\
             - Datastore: {}\n\
             - Config: {}",
            state.repo_dir.display(),
            state.blocks_path.display(),
            state.datastore_path.display(),
            state.config_path.display(),
        );

        Ok(output)
    }
}
