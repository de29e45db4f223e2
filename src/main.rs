mod aggregate;
mod auth;
mod cli;
mod config;
mod error;
mod feed;
mod orchestrator;
mod output;
mod persist;
mod snapshot;
mod source;
mod status;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting cctray - pipeline status feed publisher");
    cli.execute().await?;

    Ok(())
}
