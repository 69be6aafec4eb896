//! Outbound delivery channels for customer notifications.

use async_trait::async_trait;

pub mod email;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A channel that can deliver a [`Notification`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), email::EmailError>;
}
