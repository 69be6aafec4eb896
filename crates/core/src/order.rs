//! Order lifecycle: statuses, the transition table, provider notification
//! events, and the order record itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::manifest::BookManifest;
use crate::types::{ChildId, OrderId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PaymentConfirmed,
    Rendering,
    Submitted,
    Accepted,
    Printing,
    Shipped,
    Delivered,
    Failed,
    Expired,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        Self::Created,
        Self::PaymentConfirmed,
        Self::Rendering,
        Self::Submitted,
        Self::Accepted,
        Self::Printing,
        Self::Shipped,
        Self::Delivered,
        Self::Failed,
        Self::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Rendering => "rendering",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Printing => "printing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Expired)
    }

    /// States in which the pipeline run (render + submit) still has work.
    pub fn is_pipeline_pending(self) -> bool {
        matches!(self, Self::PaymentConfirmed | Self::Rendering)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status transition rules.
///
/// Transitions the coordinator drives itself and transitions driven by
/// provider notifications share one table; terminal states allow nothing.
/// An administrator may additionally fail any non-terminal order, including
/// one already shipped.
pub mod state_machine {
    use super::OrderStatus::{self, *};

    /// Statuses reachable from `from`.
    pub fn valid_transitions(from: OrderStatus) -> &'static [OrderStatus] {
        match from {
            Created => &[PaymentConfirmed, Expired, Failed],
            PaymentConfirmed => &[Rendering, Failed],
            Rendering => &[Submitted, Failed],
            Submitted => &[Accepted, Failed],
            // Some vendors skip the printing notification entirely.
            Accepted => &[Printing, Shipped, Failed],
            Printing => &[Shipped, Failed],
            Shipped => &[Delivered],
            Delivered | Failed | Expired => &[],
        }
    }

    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a transition, returning an error message for invalid ones.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid transition: {from} -> {to}"))
        }
    }

    /// Whether a provider notification may move an order from `from` to
    /// `to`. Provider events can only act on submitted orders.
    pub fn provider_may_apply(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(from, Submitted | Accepted | Printing | Shipped) && can_transition(from, to)
    }

    /// Whether an administrator may mark an order in `from` as failed.
    pub fn admin_may_fail(from: OrderStatus) -> bool {
        !from.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Provider notifications
// ---------------------------------------------------------------------------

/// Status event received from the print provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Accepted,
    Printing,
    Shipped,
    Delivered,
    /// Rejected, cancelled, or failed at the vendor.
    Failed,
}

impl ProviderEvent {
    /// Parse the provider's `event` field, e.g. `order.shipped`.
    pub fn parse(event: &str) -> Option<Self> {
        let name = event.strip_prefix("order.").unwrap_or(event);
        match name {
            "accepted" => Some(Self::Accepted),
            "printing" => Some(Self::Printing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "failed" | "rejected" | "cancelled" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn target_status(self) -> OrderStatus {
        match self {
            Self::Accepted => OrderStatus::Accepted,
            Self::Printing => OrderStatus::Printing,
            Self::Shipped => OrderStatus::Shipped,
            Self::Delivered => OrderStatus::Delivered,
            Self::Failed => OrderStatus::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Shipping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Expedited,
    Express,
}

impl ShippingMethod {
    /// Value sent to the print provider.
    pub fn provider_code(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Expedited => "EXPEDITED",
            Self::Express => "EXPRESS",
        }
    }
}

fn default_country() -> String {
    "US".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub street1: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub street2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 2, max = 50))]
    pub state: String,
    #[validate(length(min = 3, max = 12))]
    pub zip: String,
    #[serde(default = "default_country")]
    #[validate(length(equal = 2))]
    pub country: String,
    #[serde(default)]
    pub method: ShippingMethod,
}

impl ShippingAddress {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(format!("Invalid shipping address: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Order record
// ---------------------------------------------------------------------------

/// Rendered artifacts of an order. Preserved after failure for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub cover_url: String,
    pub interior_url: String,
    pub cover_bytes: u64,
    pub interior_bytes: u64,
    /// SHA-256 over both documents.
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub number: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub child_id: ChildId,
    pub contact_email: String,
    pub status: OrderStatus,
    pub manifest: BookManifest,
    pub shipping: ShippingAddress,
    pub payment_token: Option<String>,
    pub artifacts: Option<ArtifactRecord>,
    pub provider_order_id: Option<String>,
    pub tracking: Option<Tracking>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// A fresh order in `created`.
    pub fn new(
        id: OrderId,
        contact_email: String,
        manifest: BookManifest,
        shipping: ShippingAddress,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            child_id: manifest.child_id.clone(),
            contact_email,
            status: OrderStatus::Created,
            manifest,
            shipping,
            payment_token: None,
            artifacts: None,
            provider_order_id: None,
            tracking: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `update` in place. Callers validate the transition first.
    pub fn apply(&mut self, update: &OrderUpdate, now: Timestamp) {
        self.status = update.status;
        if let Some(token) = &update.payment_token {
            self.payment_token = Some(token.clone());
        }
        if let Some(artifacts) = &update.artifacts {
            self.artifacts = Some(artifacts.clone());
        }
        if let Some(id) = &update.provider_order_id {
            self.provider_order_id = Some(id.clone());
        }
        if let Some(tracking) = &update.tracking {
            self.tracking = Some(tracking.clone());
        }
        if let Some(error) = &update.last_error {
            self.last_error = Some(error.clone());
        }
        self.updated_at = now;
    }
}

/// A status change plus the fields that change with it. Fields left `None`
/// keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub payment_token: Option<String>,
    pub artifacts: Option<ArtifactRecord>,
    pub provider_order_id: Option<String>,
    pub tracking: Option<Tracking>,
    pub last_error: Option<String>,
}

impl OrderUpdate {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            payment_token: None,
            artifacts: None,
            provider_order_id: None,
            tracking: None,
            last_error: None,
        }
    }

    pub fn with_payment_token(mut self, token: impl Into<String>) -> Self {
        self.payment_token = Some(token.into());
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactRecord) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_provider_order_id(mut self, id: impl Into<String>) -> Self {
        self.provider_order_id = Some(id.into());
        self
    }

    pub fn with_tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = Some(tracking);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
