pub mod calendar;
pub mod generation;
pub mod health;
pub mod images;
pub mod media;
pub mod prompts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /content-calendar                 list (?date=), create
/// /notion-image                     relay a remote image (?url=)
/// /outfits                          list
/// /reference-images                 list, create
/// /prompts                          list favourites
/// /variation-prompts                list
/// /generation                       current job, submit, cancel
/// /generation/models                list models
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/content-calendar", calendar::router())
        .nest("/notion-image", images::router())
        .merge(media::router())
        .merge(prompts::router())
        .nest("/generation", generation::router())
}
