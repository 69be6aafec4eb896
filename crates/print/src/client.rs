//! REST client for the print vendor's order API.
//!
//! `POST {api_url}/orders` with an `Idempotency-Key` header equal to the
//! order id. A `409 Conflict` means the vendor already has the order and is
//! treated as success.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use unwritten_core::error::PipelineError;
use unwritten_core::ports::{PrintOrderRequest, PrintProvider};

use crate::config::RpiConfig;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateOrderBody<'a> {
    pub external_id: &'a str,
    pub items: Vec<OrderItem<'a>>,
    pub shipping: ShippingBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct OrderItem<'a> {
    pub sku: &'a str,
    pub quantity: u32,
    pub cover_url: &'a str,
    pub guts_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ShippingBody<'a> {
    pub name: &'a str,
    pub street1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<&'a str>,
    pub city: &'a str,
    pub state: &'a str,
    pub zip: &'a str,
    pub country: &'a str,
    pub method: &'static str,
}

impl<'a> CreateOrderBody<'a> {
    pub fn from_request(request: &'a PrintOrderRequest) -> Self {
        let shipping = &request.shipping;
        Self {
            external_id: request.external_id.as_str(),
            items: vec![OrderItem {
                sku: &request.sku,
                quantity: request.quantity,
                cover_url: &request.cover_url,
                guts_url: &request.guts_url,
            }],
            shipping: ShippingBody {
                name: &shipping.name,
                street1: &shipping.street1,
                street2: shipping.street2.as_deref(),
                city: &shipping.city,
                state: &shipping.state,
                zip: &shipping.zip,
                country: &shipping.country,
                method: shipping.method.provider_code(),
            },
        }
    }
}

/// Response of a create (or a 409 for an existing order).
#[derive(Debug, Deserialize)]
pub struct CreateOrderResponse {
    #[serde(alias = "order_id")]
    pub id: String,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PrintApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The vendor returned a non-2xx status code.
    #[error("Print API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A 2xx/409 response without a usable order id.
    #[error("Print API response missing order id: {0}")]
    MissingOrderId(String),
}

impl PrintApiError {
    /// Whether the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::MissingOrderId(_) => false,
        }
    }
}

impl From<PrintApiError> for PipelineError {
    fn from(err: PrintApiError) -> Self {
        if err.is_transient() {
            PipelineError::ProviderUnavailable(err.to_string())
        } else {
            PipelineError::Provider(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct RpiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl RpiClient {
    pub fn new(config: &RpiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &RpiConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Submit an order; returns the vendor's order id.
    pub async fn submit_order(&self, request: &PrintOrderRequest) -> Result<String, PrintApiError> {
        let response = self
            .client
            .post(format!("{}/orders", self.api_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .json(&CreateOrderBody::from_request(request))
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == StatusCode::CONFLICT {
            tracing::info!(
                order_id = %request.external_id,
                "Print provider already has this order"
            );
            return Self::order_id_from(&body);
        }
        if !status.is_success() {
            return Err(PrintApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Self::order_id_from(&body)
    }

    fn order_id_from(body: &str) -> Result<String, PrintApiError> {
        serde_json::from_str::<CreateOrderResponse>(body)
            .map(|r| r.id)
            .map_err(|_| PrintApiError::MissingOrderId(body.chars().take(200).collect()))
    }
}

#[async_trait]
impl PrintProvider for RpiClient {
    async fn create_order(&self, request: &PrintOrderRequest) -> Result<String, PipelineError> {
        let provider_id = self.submit_order(request).await?;
        tracing::info!(
            order_id = %request.external_id,
            provider_order_id = %provider_id,
            "Print order submitted"
        );
        Ok(provider_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
