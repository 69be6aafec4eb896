//! Order row model and its conversion to the core `Order`.

use serde::Serialize;
use sqlx::FromRow;
use unwritten_core::error::CoreError;
use unwritten_core::order::{ArtifactRecord, Order, ShippingAddress, Tracking};
use unwritten_core::manifest::BookManifest;
use unwritten_core::types::{ChildId, OrderId, Timestamp};

use super::status::{OrderStatusId, StatusId};

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderRow {
    pub id: String,
    pub child_id: String,
    pub contact_email: String,
    pub status_id: StatusId,
    pub manifest: serde_json::Value,
    pub shipping: serde_json::Value,
    pub payment_token: Option<String>,
    pub artifacts: Option<serde_json::Value>,
    pub provider_order_id: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn decode<T: serde::de::DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> Result<T, CoreError> {
    serde_json::from_value(value)
        .map_err(|e| CoreError::Internal(format!("Corrupt orders.{column}: {e}")))
}

fn encode<T: Serialize>(column: &str, value: &T) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Internal(format!("Cannot encode orders.{column}: {e}")))
}

impl OrderRow {
    pub fn from_order(order: &Order) -> Result<Self, CoreError> {
        Ok(Self {
            id: order.id.to_string(),
            child_id: order.child_id.as_str().to_string(),
            contact_email: order.contact_email.clone(),
            status_id: OrderStatusId::from(order.status).id(),
            manifest: encode("manifest", &order.manifest)?,
            shipping: encode("shipping", &order.shipping)?,
            payment_token: order.payment_token.clone(),
            artifacts: order
                .artifacts
                .as_ref()
                .map(|a| encode("artifacts", a))
                .transpose()?,
            provider_order_id: order.provider_order_id.clone(),
            tracking_number: order.tracking.as_ref().map(|t| t.number.clone()),
            tracking_url: order.tracking.as_ref().and_then(|t| t.url.clone()),
            last_error: order.last_error.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    pub fn into_order(self) -> Result<Order, CoreError> {
        let status = OrderStatusId::from_id(self.status_id)
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "Order {} has unknown status id {}",
                    self.id, self.status_id
                ))
            })?
            .into();
        let manifest: BookManifest = decode("manifest", self.manifest)?;
        let shipping: ShippingAddress = decode("shipping", self.shipping)?;
        let artifacts: Option<ArtifactRecord> =
            self.artifacts.map(|v| decode("artifacts", v)).transpose()?;
        let tracking = self.tracking_number.map(|number| Tracking {
            number,
            url: self.tracking_url,
        });

        Ok(Order {
            id: OrderId(self.id),
            child_id: ChildId(self.child_id),
            contact_email: self.contact_email,
            status,
            manifest,
            shipping,
            payment_token: self.payment_token,
            artifacts,
            provider_order_id: self.provider_order_id,
            tracking,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
