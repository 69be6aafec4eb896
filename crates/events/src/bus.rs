//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`OrderEvent`]s. It is
//! shared via `Arc<EventBus>` between the coordinator and the notification
//! router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use unwritten_core::order::OrderStatus;
use unwritten_core::types::OrderId;

/// Event type names published by the order coordinator.
pub mod event_types {
    pub const ORDER_CREATED: &str = "order.created";
    pub const ORDER_STATUS_CHANGED: &str = "order.status_changed";
    pub const ORDER_FAILED: &str = "order.failed";
}

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

/// Something that happened to an order.
///
/// Constructed via [`OrderEvent::new`] (or the shorthands) and enriched with
/// [`with_contact`](OrderEvent::with_contact) and
/// [`with_payload`](OrderEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Dot-separated event name, e.g. `"order.status_changed"`.
    pub event_type: String,

    pub order_id: OrderId,

    /// Status after the change, for status events.
    pub status: Option<OrderStatus>,

    /// Customer address to notify, when known.
    pub contact_email: Option<String>,

    /// Event-specific data (tracking number, error message, ...).
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(event_type: impl Into<String>, order_id: OrderId) -> Self {
        Self {
            event_type: event_type.into(),
            order_id,
            status: None,
            contact_email: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// `order.status_changed` for a move into `status`.
    pub fn status_changed(order_id: OrderId, status: OrderStatus) -> Self {
        let mut event = Self::new(
            if status == OrderStatus::Failed {
                event_types::ORDER_FAILED
            } else {
                event_types::ORDER_STATUS_CHANGED
            },
            order_id,
        );
        event.status = Some(status);
        event
    }

    pub fn with_contact(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

pub struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: OrderEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
