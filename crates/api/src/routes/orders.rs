//! Route definitions for orders and book previews.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// Order routes mounted at `/orders`.
///
/// ```text
/// POST /      -> create_order
/// GET  /{id}  -> get_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create_order))
        .route("/{id}", get(orders::get_order))
}

/// Child-scoped routes mounted at `/children`.
///
/// ```text
/// GET /{child_id}/book-preview  -> book_preview
/// ```
pub fn children_router() -> Router<AppState> {
    Router::new().route("/{child_id}/book-preview", get(orders::book_preview))
}
