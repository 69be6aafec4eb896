//! Order event bus and customer notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OrderEvent`]: the order lifecycle event envelope.
//! - [`delivery`]: outbound channels (email).
//! - [`NotificationRouter`]: turns lifecycle events into customer emails.

pub mod bus;
pub mod delivery;
pub mod router;

pub use bus::{EventBus, OrderEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::{Notification, Notifier};
pub use router::NotificationRouter;
