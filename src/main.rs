use anyhow::Result;
use clap::Parser;
use rankboard::cli::Cli;
use rankboard::config::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    cli.run().await
}
