//! Handlers for book orders and layout previews.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use unwritten_core::entry::DateRange;
use unwritten_core::format::DEFAULT_FORMAT_KEY;
use unwritten_core::manifest::{BookManifest, CoverTemplate};
use unwritten_core::order::{ArtifactRecord, Order, OrderStatus, ShippingAddress, Tracking};
use unwritten_core::types::{CalendarDate, ChildId, OrderId, Timestamp};
use unwritten_pipeline::NewOrder;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

fn default_format() -> String {
    DEFAULT_FORMAT_KEY.to_string()
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub child_id: ChildId,
    pub range: DateRange,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub cover_template: CoverTemplate,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Shipping and failure notices are sent here.
    #[validate(email)]
    pub contact_email: String,
    pub shipping: ShippingAddress,
}

/// Customer-facing view of an order. Omits the full manifest and the
/// payment token.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub child_id: ChildId,
    pub status: OrderStatus,
    pub format: String,
    pub cover_template: CoverTemplate,
    pub quantity: u32,
    pub range: DateRange,
    pub page_count: u32,
    pub manifest_digest: String,
    pub artifacts: Option<ArtifactRecord>,
    pub provider_order_id: Option<String>,
    pub tracking: Option<Tracking>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let format = &order.manifest.format;
        Self {
            id: order.id.clone(),
            child_id: order.child_id.clone(),
            status: order.status,
            format: format.profile.key.clone(),
            cover_template: format.cover_template,
            quantity: format.quantity,
            range: order.manifest.range,
            page_count: order.manifest.page_count,
            manifest_digest: order.manifest.digest.clone(),
            artifacts: order.artifacts.clone(),
            provider_order_id: order.provider_order_id.clone(),
            tracking: order.tracking.clone(),
            last_error: order.last_error.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedOrder {
    pub order: OrderView,
    pub page_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookPreview {
    pub page_count: u32,
    pub entry_count: usize,
    pub spine_width_in: f64,
    pub manifest: BookManifest,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// POST /api/v1/orders
///
/// Select the child's entries for the range, lay out the book and store the
/// order as `created`. Nothing is rendered until payment is confirmed.
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid order request: {e}")))?;

    let order = state
        .coordinator
        .create_order(NewOrder {
            id: OrderId::generate(),
            child_id: input.child_id,
            range: input.range,
            format_key: input.format,
            cover_template: input.cover_template,
            quantity: input.quantity,
            contact_email: input.contact_email,
            shipping: input.shipping,
        })
        .await?;

    let page_count = order.manifest.page_count;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedOrder {
                order: OrderView::from(&order),
                page_count,
            },
        }),
    ))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let order = state.coordinator.get_order(&OrderId(id)).await?;
    Ok(Json(DataResponse {
        data: OrderView::from(&order),
    }))
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// GET /api/v1/children/{child_id}/book-preview?start=&end=&format=
///
/// Lay out the book a range would produce without creating an order.
pub async fn book_preview(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    Query(params): Query<PreviewParams>,
) -> AppResult<impl IntoResponse> {
    let range = DateRange::new(params.start, params.end)?;
    let format_key = params.format.unwrap_or_else(default_format);

    let manifest = state
        .coordinator
        .preview(&ChildId(child_id), range, &format_key)
        .await?;

    tracing::debug!(
        child_id = %manifest.child_id,
        pages = manifest.page_count,
        "Book preview built"
    );

    Ok(Json(DataResponse {
        data: BookPreview {
            page_count: manifest.page_count,
            entry_count: manifest.entry_count(),
            spine_width_in: manifest.cover_spread().spine_in,
            manifest,
        },
    }))
}
