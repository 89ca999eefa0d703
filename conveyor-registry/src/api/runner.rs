//! Runner API Handlers
//!
//! HTTP endpoints for runner registration and status.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use conveyor_core::domain::runner::Runner;
use conveyor_core::dto::page::Page;
use conveyor_core::dto::runner::{RegisterRunner, RunnerFilterParams, RunnerStatusPatch};

use crate::api::error::ApiResult;
use crate::api::{AppState, RangeParams};
use crate::service::runner_service;

// =============================================================================
// Runner Registration & Lifecycle
// =============================================================================

/// POST /runners
/// Register a runner with the registry
pub async fn register_runner(
    State(state): State<AppState>,
    Json(req): Json<RegisterRunner>,
) -> ApiResult<(StatusCode, Json<Runner>)> {
    tracing::info!(
        "Registering runner at {}",
        req.callback.as_deref().unwrap_or("<no callback>")
    );

    let runner = runner_service::register_runner(state.runners.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(runner)))
}

/// PATCH /runners/{id}
/// Record a runner's status; doubles as its heartbeat
pub async fn patch_runner_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RunnerStatusPatch>,
) -> ApiResult<StatusCode> {
    runner_service::patch_runner_status(state.runners.as_ref(), &id, patch).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Runner Query
// =============================================================================

/// GET /runners
/// List runners matching the filter parameters
pub async fn list_runners(
    State(state): State<AppState>,
    Query(filter): Query<RunnerFilterParams>,
    Query(range): Query<RangeParams>,
) -> ApiResult<Json<Page<Runner>>> {
    tracing::debug!("Listing runners: {:?}", filter);

    let page = runner_service::search_runners(
        state.runners.as_ref(),
        &filter.into(),
        range.start,
        range.end,
    )
    .await?;

    Ok(Json(page))
}

/// GET /runners/{id}
/// Get runner details by ID
pub async fn get_runner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Runner>> {
    tracing::debug!("Getting runner: {}", id);

    let runner = runner_service::get_runner(state.runners.as_ref(), &id).await?;

    Ok(Json(runner))
}
