//! Route definitions for the content calendar, mounted at `/content-calendar`.

use axum::routing::get;
use axum::Router;

use crate::handlers::calendar;
use crate::state::AppState;

/// ```text
/// GET    /      -> list_entries (?date=YYYY-MM-DD)
/// POST   /      -> create_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(calendar::list_entries).post(calendar::create_entry))
}
