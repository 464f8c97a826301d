//! Bidcraft: proposal drafting and BD research backends over the Anthropic API.
//!
//! One binary, two deployments: `bidcraft serve proposal` and
//! `bidcraft serve research`.

mod commands;
mod error;
mod routes;
mod sse;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
