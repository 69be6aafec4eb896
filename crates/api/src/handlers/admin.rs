//! Administrative order actions. All endpoints require [`AdminToken`].

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use unwritten_core::types::OrderId;

use crate::error::{AppError, AppResult};
use crate::handlers::orders::OrderView;
use crate::middleware::admin::AdminToken;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FailOrderRequest {
    pub reason: String,
}

/// POST /api/v1/admin/orders/{id}/fail
///
/// Cancel any in-flight pipeline run and mark the order `failed`. Terminal
/// orders answer 409.
pub async fn fail_order(
    _admin: AdminToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<FailOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("reason must not be empty".into()));
    }

    let order = state.coordinator.admin_fail(&OrderId(id), reason).await?;

    Ok(Json(DataResponse {
        data: OrderView::from(&order),
    }))
}
