//! Health Check API Handler
//!
//! Liveness endpoint for monitoring, with entity counts.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let jobs = state
        .jobs
        .all(0, 0)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let runners = state
        .runners
        .all(0, 0)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(json!({
        "status": "ok",
        "jobs": jobs.total,
        "runners": runners.total,
    })))
}
