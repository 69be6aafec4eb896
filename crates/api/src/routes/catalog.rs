use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Catalog routes, merged at the `/api/v1` root.
///
/// ```text
/// GET /formats         -> list_formats
/// GET /prompts/daily   -> get_daily_prompt
/// GET /prompts/random  -> get_random_prompt
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/formats", get(catalog::list_formats))
        .route("/prompts/daily", get(catalog::get_daily_prompt))
        .route("/prompts/random", get(catalog::get_random_prompt))
}
