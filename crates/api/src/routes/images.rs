use axum::routing::get;
use axum::Router;

use crate::handlers::image_proxy;
use crate::state::AppState;

/// Image relay mounted at `/notion-image`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(image_proxy::fetch_image))
}
