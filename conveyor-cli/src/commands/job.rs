//! Job command handlers
//!
//! Handles all job-related CLI commands: submitting, listing with filters,
//! and viewing details.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use conveyor_client::RegistryClient;
use conveyor_core::domain::job::{ExitStatus, Job, JobStatus, RunStatus};
use conveyor_core::dto::job::{CreateJob, JobFilterParams};

use super::{format_time, print_json};
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a new job
    Submit {
        /// Job name
        #[arg(long)]
        name: String,

        /// Job category
        #[arg(long)]
        category: String,

        /// Account the job is submitted for
        #[arg(long)]
        account: String,

        /// Command line, one --arg per word (e.g. --arg make --arg all)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List jobs
    List {
        /// Only jobs of this account
        #[arg(long)]
        account: Option<String>,

        /// Only jobs of this category
        #[arg(long)]
        category: Option<String>,

        /// Only jobs with one of these names
        #[arg(long = "name")]
        names: Vec<String>,

        /// Only jobs in this run status (PENDING, RUNNING, DONE)
        #[arg(long)]
        status: Option<RunStatus>,

        /// Only jobs with this exit status (SUCCESS, FAILURE)
        #[arg(long)]
        exit: Option<ExitStatus>,

        /// First position of the listing window
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Last position of the listing window
        #[arg(long, default_value_t = 99)]
        end: usize,
    },
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = RegistryClient::new(&config.registry_url);

    match command {
        JobCommands::Submit {
            name,
            category,
            account,
            args,
        } => {
            let req = CreateJob {
                name: Some(name),
                category: Some(category),
                account_id: Some(account),
                arguments: args,
            };
            submit_job(&client, req, config).await
        }
        JobCommands::List {
            account,
            category,
            names,
            status,
            exit,
            start,
            end,
        } => {
            let filter = JobFilterParams {
                account_id: account,
                category,
                run_status: status,
                exit_status: exit,
                ..Default::default()
            }
            .with_names(&names);
            list_jobs(&client, &filter, start, end, config).await
        }
        JobCommands::Get { id } => get_job(&client, &id, config).await,
    }
}

/// Submit a job and show what the registry stored
async fn submit_job(client: &RegistryClient, req: CreateJob, config: &Config) -> Result<()> {
    let job = client
        .launch_job(&req)
        .await
        .context("Failed to submit job")?;

    if config.json {
        return print_json(&job);
    }

    println!("{} Submitted job {}", "✓".green(), job.id.cyan());
    print_job_details(&job);

    Ok(())
}

/// List jobs matching a filter
async fn list_jobs(
    client: &RegistryClient,
    filter: &JobFilterParams,
    start: usize,
    end: usize,
    config: &Config,
) -> Result<()> {
    let page = client.list_jobs(filter, start, end).await?;

    if config.json {
        return print_json(&page);
    }

    if page.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!(
            "{}",
            format!(
                "Showing {}-{} of {} job(s):",
                page.start, page.end, page.total
            )
            .bold()
        );
        println!();
        for job in &page.items {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &RegistryClient, id: &str, config: &Config) -> Result<()> {
    let id = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(&id).await?;

    if config.json {
        return print_json(&job);
    }

    print_job_details(&job);

    Ok(())
}

/// Print a job summary
fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.id.dimmed());
    println!(
        "    Name:      {} ({})",
        job.value.name.as_deref().unwrap_or("-"),
        job.value.category.as_deref().unwrap_or("-")
    );
    println!(
        "    Account:   {}",
        job.value.accounting.account_id.as_deref().unwrap_or("-")
    );
    println!("    Status:    {}", colorize_status(&job.value.status));
    println!(
        "    Submitted: {}",
        format_time(job.value.processing.submitted).dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    let value = &job.value;

    println!("{}", "Job Details:".bold());
    println!("  ID:         {}", job.id.cyan());
    println!("  Version:    {}", job.version);
    println!("  Name:       {}", value.name.as_deref().unwrap_or("-"));
    println!("  Category:   {}", value.category.as_deref().unwrap_or("-"));
    println!(
        "  Account:    {}",
        value.accounting.account_id.as_deref().unwrap_or("-")
    );
    println!("  Status:     {}", colorize_status(&value.status));
    println!("  Submitted:  {}", format_time(value.processing.submitted));
    println!("  Started:    {}", format_time(value.processing.started));
    println!("  Finished:   {}", format_time(value.processing.finished));

    if let (Some(started), Some(finished)) = (value.processing.started, value.processing.finished)
    {
        let duration = finished.signed_duration_since(started);
        println!("  Duration:   {}s", duration.num_seconds());
    }

    if !value.arguments.is_empty() {
        println!("\n{}", "Arguments:".bold());
        println!("  {}", value.arguments.join(" "));
    }

    if let Some(result) = &value.result {
        println!("\n{}", "Result:".bold());
        match value.status.exit {
            Some(ExitStatus::Failure) => println!("{}", result.red()),
            _ => println!("{}", result),
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    match (status.run, status.exit) {
        (Some(RunStatus::Done), Some(ExitStatus::Success)) => "DONE (SUCCESS)".green(),
        (Some(RunStatus::Done), Some(ExitStatus::Failure)) => "DONE (FAILURE)".red(),
        (Some(RunStatus::Done), None) => "DONE".normal(),
        (Some(RunStatus::Running), _) => "RUNNING".cyan(),
        (Some(RunStatus::Pending), _) => "PENDING".yellow(),
        (None, _) => "UNKNOWN".dimmed(),
    }
}
