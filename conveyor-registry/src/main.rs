use std::sync::Arc;

use anyhow::Context;
use conveyor_core::domain::job::JobValue;
use conveyor_core::domain::runner::RunnerValue;
use conveyor_core::query::{JobQuery, RunnerQuery};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{InMemoryRepository, JobRepository, RunnerRepository};
use crate::service::cleaner::Cleaner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_registry=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Conveyor Registry...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Cleanup every {:?}, job retention {:?}, runner retention {:?}",
        config.cleanup_interval,
        config.job_retention,
        config.runner_retention
    );

    let jobs: Arc<JobRepository> = Arc::new(InMemoryRepository::<JobValue, JobQuery>::new());
    let runners: Arc<RunnerRepository> =
        Arc::new(InMemoryRepository::<RunnerValue, RunnerQuery>::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleaner = Cleaner::new(&config, Arc::clone(&jobs), Arc::clone(&runners)).spawn(shutdown_rx);

    // Build router with all API endpoints
    let app = api::create_router(AppState { jobs, runners });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down...");

    let _ = shutdown_tx.send(true);
    if let Err(e) = cleaner.await {
        tracing::warn!("Cleaner task ended abnormally: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
