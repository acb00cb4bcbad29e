//! Route definitions for image generation, mounted at `/generation`.

use axum::routing::get;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// ```text
/// GET    /           -> current_job
/// POST   /           -> submit_job
/// DELETE /           -> cancel_job
/// GET    /models     -> list_models
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(generation::current_job)
                .post(generation::submit_job)
                .delete(generation::cancel_job),
        )
        .route("/models", get(generation::list_models))
}
