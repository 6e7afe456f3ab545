pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pinstore")]
#[command(about = "Pin, store and garbage-collect content-addressed blocks")]
pub struct Args {
    /// Path to the repo directory (defaults to ~/.pinstore)
    #[arg(long, global = true)]
    pub repo_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
