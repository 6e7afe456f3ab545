mod args;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Block, Gc, Init, Pin, Version};
use state::AppState;

command_enum! {
    (Block, Block),
    (Gc, Gc),
    (Init, Init),
    (Pin, Pin),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Fall back to defaults so `init` and friends still log
    let config = AppState::load(args.repo_path.clone())
        .map(|state| state.config)
        .unwrap_or_default();
    let guards = logging::init(&config);

    let ctx = op::OpContext::new(args.repo_path);
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush the non-blocking writers before exiting
    drop(guards);
    std::process::exit(code);
}
