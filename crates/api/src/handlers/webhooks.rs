//! Inbound webhooks: payment confirmations and print provider notifications.
//!
//! Both endpoints authenticate the raw body before parsing it. A forged,
//! stale or unsigned request gets an empty 400 and changes nothing; the
//! rejection is logged at `warn` for audit.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use unwritten_core::order::{ProviderEvent, Tracking};
use unwritten_core::signing::{
    verify_payment_signature, verify_provider_signature, PAYMENT_SIGNATURE_HEADER,
    PROVIDER_SIGNATURE_HEADER,
};
use unwritten_core::types::OrderId;
use unwritten_pipeline::{EventOutcome, PaymentOutcome};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    pub confirmation_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ProviderNotification {
    pub event: String,
    pub external_id: OrderId,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

/// Acknowledgement body. `outcome` is informational only.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub outcome: &'static str,
}

fn ack(outcome: &'static str) -> Response {
    Json(DataResponse {
        data: WebhookAck { outcome },
    })
    .into_response()
}

fn signature_header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// POST /webhooks/payment
///
/// Record a payment confirmation and start the order's pipeline. Replays
/// are acknowledged without starting a second run.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let header = signature_header(&headers, PAYMENT_SIGNATURE_HEADER);
    if let Err(e) = verify_payment_signature(
        &state.config.payment_webhook_secret,
        header,
        &body,
        Utc::now().timestamp(),
        state.config.signature_tolerance_secs,
    ) {
        tracing::warn!(reason = %e, "Rejected payment confirmation");
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }

    let confirmation: PaymentConfirmation = match serde_json::from_slice(&body) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Signed payment confirmation has an invalid body");
            return Ok(StatusCode::BAD_REQUEST.into_response());
        }
    };

    let outcome = state
        .coordinator
        .confirm_payment(&confirmation.order_id, &confirmation.confirmation_token)
        .await?;

    Ok(match outcome {
        PaymentOutcome::Confirmed => {
            state.coordinator.spawn_pipeline(confirmation.order_id);
            ack("confirmed")
        }
        PaymentOutcome::Duplicate => ack("duplicate"),
        PaymentOutcome::UnknownOrder => ack("unknown_order"),
        PaymentOutcome::NotPayable(_) => ack("not_payable"),
    })
}

// ---------------------------------------------------------------------------
// Print provider
// ---------------------------------------------------------------------------

/// POST /webhooks/print-provider
///
/// Apply a vendor status notification. Authenticated notifications are
/// always acknowledged with 200, including ones that are discarded as out
/// of order, so the vendor does not keep redelivering them.
pub async fn provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let header = signature_header(&headers, PROVIDER_SIGNATURE_HEADER);
    if let Err(e) = verify_provider_signature(&state.config.provider_webhook_secret, header, &body)
    {
        tracing::warn!(reason = %e, "Rejected print provider notification");
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }

    let notification: ProviderNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Signed provider notification has an invalid body");
            return Ok(StatusCode::BAD_REQUEST.into_response());
        }
    };

    let Some(event) = ProviderEvent::parse(&notification.event) else {
        tracing::info!(
            order_id = %notification.external_id,
            event = %notification.event,
            "Ignoring unrecognised provider event"
        );
        return Ok(ack("ignored"));
    };

    let tracking = notification.tracking_number.map(|number| Tracking {
        number,
        url: notification.tracking_url,
    });

    let outcome = state
        .coordinator
        .apply_provider_event(&notification.external_id, event, tracking)
        .await?;

    Ok(match outcome {
        EventOutcome::Applied(_) => ack("applied"),
        EventOutcome::Discarded => ack("discarded"),
    })
}
