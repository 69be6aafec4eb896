use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Webhook receivers (root-level, NOT under `/api/v1`).
///
/// ```text
/// POST /webhooks/payment         -> payment_webhook
/// POST /webhooks/print-provider  -> provider_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/payment", post(webhooks::payment_webhook))
        .route("/webhooks/print-provider", post(webhooks::provider_webhook))
}
