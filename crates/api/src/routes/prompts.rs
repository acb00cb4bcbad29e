use axum::routing::get;
use axum::Router;

use crate::handlers::prompts;
use crate::state::AppState;

/// ```text
/// GET    /prompts              -> list_favourite_prompts
/// GET    /variation-prompts    -> list_variation_prompts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts", get(prompts::list_favourite_prompts))
        .route("/variation-prompts", get(prompts::list_variation_prompts))
}
