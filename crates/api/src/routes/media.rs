//! Route definitions for the image collections.

use axum::routing::get;
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

/// ```text
/// GET    /outfits             -> list_outfits
/// GET    /reference-images    -> list_reference_images
/// POST   /reference-images    -> create_reference_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/outfits", get(media::list_outfits))
        .route(
            "/reference-images",
            get(media::list_reference_images).post(media::create_reference_image),
        )
}
