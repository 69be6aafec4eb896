use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// POST /orders/{id}/fail  -> fail_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/orders/{id}/fail", post(admin::fail_order))
}
