//! Handlers for image generation.
//!
//! The job runs in the background on the server; the front end polls
//! `GET /api/generation` for progress instead of talking to the provider.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lookbook_core::generation::GenerationRequest;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/generation/models
pub async fn list_models(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(json!({ "models": state.generation.registry().models() })))
}

/// POST /api/generation
///
/// Validate and start a job, replacing any job still running. Responds 202
/// with the queued job.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Result<Json<GenerationRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body?;

    let job = state.generation.submit(&request)?;

    tracing::info!(job_id = %job.id, model = %job.model, "Generation submitted");

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /api/generation
///
/// Snapshot of the current job, `null` when none was submitted.
pub async fn current_job(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(json!({ "job": state.generation.current() })))
}

/// DELETE /api/generation
pub async fn cancel_job(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let cancelled = state.generation.cancel();
    Ok(Json(json!({ "cancelled": cancelled })))
}
