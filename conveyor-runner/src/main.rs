//! Conveyor Runner
//!
//! A worker process that reserves pending jobs from the registry and runs
//! them on a fixed pool of worker threads.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Repositories: HTTP communication with the registry (jobs, runners)
//! - Pool: Feeders, workers and the bounded worker pool
//! - Manager: Job reservation and reporting
//! - Status: Heartbeat pushing the runner status
//! - Scheduler: Job polling and dispatch to the pool
//!
//! A job report the registry will not take stops the runner with a non-zero
//! exit: local and registry state have diverged.

mod config;
mod feeder;
mod manager;
mod pool;
mod processor;
mod repository;
mod scheduler;
mod status;
mod worker;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::manager::JobManager;
use crate::pool::{LocalJobLocks, WorkerProcessingPool};
use crate::processor::CommandProcessorFactory;
use crate::repository::{HttpJobRepository, HttpRunnerRepository, RunnerRepository};
use crate::scheduler::{JobPoller, job_handler};
use crate::status::{RegistryNotifier, RunnerStatusManager};
use conveyor_client::RegistryClient;
use conveyor_core::domain::runner::{Competencies, RunnerStatus};
use conveyor_core::dto::runner::RegisterRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Conveyor Runner");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: account={}, category={}, names={:?}, registry_url={}",
        config.account_id, config.category, config.job_names, config.registry_url
    );

    // Initialize repositories
    let client = RegistryClient::new(config.registry_url.clone());
    let runners: Arc<dyn RunnerRepository> = Arc::new(HttpRunnerRepository::new(client.clone()));
    let jobs = Arc::new(HttpJobRepository::new(client));

    // Register with the registry (with retry logic)
    let registration = RegisterRunner {
        callback: Some(config.callback.clone()),
        time_to_live: Some(config.time_to_live),
        competencies: Some(Competencies::new(
            vec![config.category.clone()],
            config.job_names.clone(),
        )),
    };
    let runner_id = register_with_retry(runners.as_ref(), &registration).await?;
    info!("Registered as runner {}", runner_id);

    // Build the pool
    let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
    let manager = Arc::new(JobManager::new(&config, jobs, fatal_tx));
    let pool = Arc::new(WorkerProcessingPool::new(
        "worker",
        config.worker_count,
        Arc::new(LocalJobLocks::new()),
        job_handler(
            Arc::clone(&manager),
            Arc::new(CommandProcessorFactory),
            tokio::runtime::Handle::current(),
        ),
        config.worker_wait_timeout,
    ));

    // Heartbeat follows the pool's FULL / ACCEPTING edges
    let heartbeat = RunnerStatusManager::new(
        pool.clone(),
        Arc::new(RegistryNotifier::new(Arc::clone(&runners), runner_id.clone())),
        config.heartbeat_interval,
    );
    pool.add_listener(heartbeat.clone());
    pool.start().context("Failed to start worker pool")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let heartbeat_handle = heartbeat.spawn(shutdown_rx.clone());

    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
        }
        let _ = signal_tx.send(true);
    });

    // Start polling loop
    info!(
        "Runner initialized: {} worker(s), poll interval {:?}",
        pool.size(),
        config.poll_interval
    );
    let mut poller = JobPoller::new(manager, Arc::clone(&pool), config.poll_interval, fatal_rx);
    let mut outcome = poller.run(shutdown_rx).await;
    if let Err(e) = &outcome {
        error!("Poller error: {:#}", e);
    }

    // Shut down
    let _ = shutdown_tx.send(true);
    if let Err(e) = heartbeat_handle.await {
        warn!("Heartbeat task failed: {}", e);
    }

    let stopping = Arc::clone(&pool);
    let timeout = config.shutdown_timeout;
    match tokio::task::spawn_blocking(move || stopping.stop(timeout)).await {
        Ok(true) => {}
        Ok(false) => warn!("Some jobs were still running at shutdown"),
        Err(e) => warn!("Failed to stop worker pool: {}", e),
    }

    // Jobs finishing while the pool drained may still have failed to report
    if outcome.is_ok() {
        outcome = poller.late_fatal();
        if let Err(e) = &outcome {
            error!("Job report failed during shutdown: {:#}", e);
        }
    }

    if let Err(e) = runners
        .patch_status(&runner_id, RunnerStatus::Disconnected)
        .await
    {
        warn!("Failed to report disconnection: {}", e);
    }

    info!("Runner stopped");
    outcome
}

/// Register with the registry with retry logic and exponential backoff
///
/// This handles the case where the registry may not be ready yet when
/// the runner starts (common in container environments).
async fn register_with_retry(
    runners: &dyn RunnerRepository,
    registration: &RegisterRunner,
) -> Result<String> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match runners.register(registration).await {
            Ok(id) => {
                if attempt > 1 {
                    info!(
                        "Successfully registered with registry after {} attempt(s)",
                        attempt
                    );
                }
                return Ok(id);
            }
            Err(e) if !e.is_transient() => {
                return Err(anyhow::anyhow!("Registry refused registration: {}", e));
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!(
                        "Failed to register with registry after {} attempts",
                        MAX_RETRIES
                    );
                    return Err(anyhow::anyhow!("Failed to register with registry: {}", e));
                }

                warn!(
                    "Failed to register with registry (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
