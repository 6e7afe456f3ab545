use clap::{Args, Subcommand};

pub mod put;
pub mod rm;
pub mod stat;

use crate::op::Op;

crate::command_enum! {
    (Put, put::Put),
    (Rm, rm::Rm),
    (Stat, stat::Stat),
}

pub type BlockCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Block {
    #[command(subcommand)]
    pub command: BlockCommand,
}

#[async_trait::async_trait]
impl Op for Block {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
