//! Runner command handlers
//!
//! Handles all runner-related CLI commands: listing and viewing runners.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use conveyor_client::RegistryClient;
use conveyor_core::domain::runner::{Runner, RunnerStatus};
use conveyor_core::dto::runner::RunnerFilterParams;

use super::{format_time, print_json};
use crate::config::Config;
use crate::id_resolver::resolve_runner_id;
use crate::types::IdOrPrefix;

/// Runner subcommands
#[derive(Subcommand)]
pub enum RunnerCommands {
    /// List registered runners
    List {
        /// Only runners servicing this category
        #[arg(long)]
        category: Option<String>,

        /// Only runners servicing this job name
        #[arg(long)]
        name: Option<String>,

        /// Only runners in this status (IDLE, RUNNING, DISCONNECTED)
        #[arg(long)]
        status: Option<RunnerStatus>,
    },
    /// Get runner details
    Get {
        /// Runner ID or unambiguous prefix
        id: String,
    },
}

/// Handle runner commands
///
/// Routes runner subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The runner command to execute
/// * `config` - The CLI configuration
pub async fn handle_runner_command(command: RunnerCommands, config: &Config) -> Result<()> {
    let client = RegistryClient::new(&config.registry_url);

    match command {
        RunnerCommands::List {
            category,
            name,
            status,
        } => {
            let filter = RunnerFilterParams {
                category,
                name,
                status,
            };
            list_runners(&client, &filter, config).await
        }
        RunnerCommands::Get { id } => get_runner(&client, &id, config).await,
    }
}

/// List registered runners
async fn list_runners(
    client: &RegistryClient,
    filter: &RunnerFilterParams,
    config: &Config,
) -> Result<()> {
    let page = client.list_runners(filter, 0, 99).await?;

    if config.json {
        return print_json(&page);
    }

    if page.is_empty() {
        println!("{}", "No runners registered.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} registered runner(s):", page.total).bold()
        );
        println!();
        for runner in &page.items {
            print_runner_summary(runner);
        }
    }

    Ok(())
}

async fn get_runner(client: &RegistryClient, id: &str, config: &Config) -> Result<()> {
    let id = resolve_runner_id(client, &IdOrPrefix::parse(id)).await?;
    let runner = client.get_runner(&id).await?;

    if config.json {
        return print_json(&runner);
    }

    print_runner_summary(&runner);
    if let Some(competencies) = &runner.value.competencies {
        println!("{}", "Competencies:".bold());
        println!(
            "  Categories: {}",
            competencies
                .categories
                .as_deref()
                .map(|c| c.join(", "))
                .unwrap_or_default()
        );
        println!(
            "  Names:      {}",
            competencies
                .names
                .as_deref()
                .map(|n| n.join(", "))
                .unwrap_or_default()
        );
    }

    Ok(())
}

/// Print a runner summary
fn print_runner_summary(runner: &Runner) {
    let value = &runner.value;
    let runtime = value.runtime.unwrap_or_default();

    println!("  {} Runner {}", "▸".cyan(), runner.id.bold());
    println!("    Status:       {}", colorize_status(value.status()));
    println!(
        "    Callback:     {}",
        value.callback.as_deref().unwrap_or("-")
    );
    println!(
        "    Time to live: {}",
        value
            .time_to_live
            .map(|ttl| format!("{}s", ttl))
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "    Registered:   {}",
        format_time(runtime.created).dimmed()
    );
    println!(
        "    Last Seen:    {}",
        format_time(runtime.last_ping).dimmed()
    );
    println!();
}

/// Colorize runner status for display
fn colorize_status(status: Option<RunnerStatus>) -> ColoredString {
    match status {
        Some(status @ RunnerStatus::Idle) => status.to_string().green(),
        Some(status @ RunnerStatus::Running) => status.to_string().yellow(),
        Some(status @ RunnerStatus::Disconnected) => status.to_string().red(),
        None => "UNKNOWN".dimmed(),
    }
}
