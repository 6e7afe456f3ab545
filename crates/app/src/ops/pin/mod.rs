use clap::{Args, Subcommand};

pub mod add;
pub mod ls;
pub mod rm;

use crate::op::Op;

crate::command_enum! {
    (Add, add::Add),
    (Rm, rm::Rm),
    (Ls, ls::Ls),
}

pub type PinCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Pin {
    #[command(subcommand)]
    pub command: PinCommand,
}

#[async_trait::async_trait]
impl Op for Pin {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
