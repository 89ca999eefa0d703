//! Conveyor CLI
//!
//! Command-line interface for submitting jobs to the Conveyor registry and
//! inspecting jobs and runners.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Conveyor job dispatch CLI", long_about = None)]
struct Cli {
    /// Registry URL
    #[arg(
        long,
        env = "CONVEYOR_REGISTRY_URL",
        default_value = "http://localhost:8080"
    )]
    registry_url: String,

    /// Print raw JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        registry_url: cli.registry_url,
        json: cli.json,
    };

    handle_command(cli.command, &config).await
}
