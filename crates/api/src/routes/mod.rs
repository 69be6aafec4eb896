pub mod admin;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST   /orders                                 -> create_order
/// GET    /orders/{id}                            -> get_order
/// GET    /children/{child_id}/book-preview       -> book_preview
/// GET    /formats                                -> list_formats
/// GET    /prompts/daily                          -> get_daily_prompt
/// GET    /prompts/random                         -> get_random_prompt
/// POST   /admin/orders/{id}/fail                 -> fail_order (admin token)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/children", orders::children_router())
        .merge(catalog::router())
        .nest("/admin", admin::router())
}
