use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub url: Option<String>,
}

/// GET /api/notion-image
///
/// Download `?url=` server-side and return it as `{dataUrl}` so the browser
/// can draw it on a canvas without cross-origin restrictions.
pub async fn fetch_image(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> AppResult<impl IntoResponse> {
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("url query parameter is required".into()))?;

    let data_url = state.images.fetch_data_url(url).await?;

    Ok(Json(json!({ "dataUrl": data_url })))
}
