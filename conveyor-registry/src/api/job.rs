//! Job API Handlers
//!
//! HTTP endpoints for job submission and lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use conveyor_core::domain::job::Job;
use conveyor_core::dto::job::{CreateJob, JobFilterParams, JobPatch};
use conveyor_core::dto::page::Page;

use crate::api::error::ApiResult;
use crate::api::{AppState, RangeParams};
use crate::service::job_service;

/// POST /jobs
/// Submit a new job
pub async fn launch_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    tracing::info!(
        "Launching job: {}",
        req.name.as_deref().unwrap_or("<unnamed>")
    );

    let job = job_service::launch_job(state.jobs.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs
/// List jobs matching the filter parameters
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilterParams>,
    Query(range): Query<RangeParams>,
) -> ApiResult<Json<Page<Job>>> {
    tracing::debug!("Listing jobs: {:?} [{}..={}]", filter, range.start, range.end);

    let page =
        job_service::search_jobs(state.jobs.as_ref(), &filter.into(), range.start, range.end)
            .await?;

    Ok(Json(page))
}

/// GET /jobs/{id}
/// Get job details by ID
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(state.jobs.as_ref(), &id).await?;

    Ok(Json(job))
}

/// PATCH /jobs/{id}
/// Conditionally update a job's status and result
pub async fn patch_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Patching job {} at version {}", id, patch.version);

    let job = job_service::patch_job(state.jobs.as_ref(), &id, patch).await?;

    Ok(Json(job))
}
