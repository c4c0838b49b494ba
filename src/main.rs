// src/main.rs
use anyhow::Result;
use breakout_pattern_calculator::cli::{execute, Cli};
use breakout_pattern_calculator::config::EngineConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    let config = EngineConfig::load()?;
    execute(cli.command, config).await
}
