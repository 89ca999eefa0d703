//! API Module
//!
//! HTTP API layer for the registry.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod runner;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::repository::{JobRepository, RunnerRepository};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobRepository>,
    pub runners: Arc<RunnerRepository>,
}

/// Inclusive listing window, `?start=0&end=99` by default
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_end")]
    pub end: usize,
}

fn default_end() -> usize {
    99
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::launch_job).get(job::list_jobs))
        .route("/jobs/{id}", get(job::get_job).patch(job::patch_job))
        // Runner endpoints
        .route(
            "/runners",
            post(runner::register_runner).get(runner::list_runners),
        )
        .route(
            "/runners/{id}",
            get(runner::get_runner).patch(runner::patch_runner_status),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
