//! Event-to-notification routing.
//!
//! [`NotificationRouter`] subscribes to the event bus and emails the
//! customer when their book ships or when their order fails.

use std::sync::Arc;

use tokio::sync::broadcast;
use unwritten_core::order::OrderStatus;

use crate::bus::OrderEvent;
use crate::delivery::{Notification, Notifier};

pub struct NotificationRouter {
    notifier: Arc<dyn Notifier>,
    support_email: String,
}

impl NotificationRouter {
    pub fn new(notifier: Arc<dyn Notifier>, support_email: impl Into<String>) -> Self {
        Self {
            notifier,
            support_email: support_email.into(),
        }
    }

    /// Run the routing loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<OrderEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn route_event(&self, event: &OrderEvent) {
        let Some(notification) = compose(event, &self.support_email) else {
            return;
        };
        if let Err(e) = self.notifier.send(&notification).await {
            tracing::error!(
                order_id = %event.order_id,
                event_type = %event.event_type,
                error = %e,
                "Failed to deliver notification"
            );
        }
    }
}

/// Build the customer message for `event`, if it warrants one.
pub fn compose(event: &OrderEvent, support_email: &str) -> Option<Notification> {
    let to = event.contact_email.clone()?;
    match event.status? {
        OrderStatus::Shipped => {
            let tracking = event.payload["tracking_number"].as_str();
            let tracking_url = event.payload["tracking_url"].as_str();
            let mut body = format!(
                "Good news! Your Unwritten book (order {}) is on its way.\n",
                event.order_id
            );
            if let Some(number) = tracking {
                body.push_str(&format!("\nTracking number: {number}\n"));
            }
            if let Some(url) = tracking_url {
                body.push_str(&format!("Track it here: {url}\n"));
            }
            body.push_str("\n365 tiny moments. One big story.\n");
            Some(Notification {
                to,
                subject: "Your Unwritten book has shipped".to_string(),
                body,
            })
        }
        OrderStatus::Failed => {
            let body = format!(
                "We hit a problem producing your Unwritten book (order {}).\n\n\
                 Reply to {} with your order number and we will sort it out.\n",
                event.order_id, support_email
            );
            Some(Notification {
                to,
                subject: format!("A problem with your Unwritten order {}", event.order_id),
                body,
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use unwritten_core::types::OrderId;

    use super::*;
    use crate::bus::EventBus;
    use crate::delivery::email::EmailError;

    #[derive(Default)]
    struct Captured {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for Captured {
        async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }
    }

    #[test]
    fn shipped_email_includes_tracking() {
        let event = OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Shipped)
            .with_contact("sarah@example.com")
            .with_payload(serde_json::json!({
                "tracking_number": "1Z999",
                "tracking_url": "https://track.test/1Z999"
            }));
        let n = compose(&event, "support@unwritten.app").unwrap();
        assert_eq!(n.to, "sarah@example.com");
        assert!(n.body.contains("1Z999"));
        assert!(n.body.contains("https://track.test/1Z999"));
    }

    #[test]
    fn failed_email_carries_order_id_and_support_contact() {
        let event = OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Failed)
            .with_contact("sarah@example.com");
        let n = compose(&event, "support@unwritten.app").unwrap();
        assert!(n.subject.contains("o1"));
        assert!(n.body.contains("support@unwritten.app"));
    }

    #[test]
    fn other_statuses_and_missing_contact_are_silent() {
        let accepted = OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Accepted)
            .with_contact("sarah@example.com");
        assert!(compose(&accepted, "s@x").is_none());

        let anonymous = OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Shipped);
        assert!(compose(&anonymous, "s@x").is_none());
    }

    #[tokio::test]
    async fn router_delivers_until_bus_closes() {
        let captured = Arc::new(Captured::default());
        let bus = EventBus::default();
        let router = NotificationRouter::new(captured.clone(), "support@unwritten.app");
        let handle = tokio::spawn(router.run(bus.subscribe()));

        bus.publish(
            OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Failed)
                .with_contact("sarah@example.com"),
        );
        bus.publish(
            OrderEvent::status_changed(OrderId::from("o1"), OrderStatus::Accepted)
                .with_contact("sarah@example.com"),
        );
        drop(bus);
        handle.await.unwrap();

        let sent = captured.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "sarah@example.com");
    }
}
