//! Print-book pipeline: range selection, rendering and the order
//! coordinator that drives a paid order through render and submission.

pub mod config;
pub mod coordinator;
pub mod paid;
pub mod range;
pub mod render;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use coordinator::{EventOutcome, NewOrder, OrderCoordinator, PaymentOutcome, Services};
pub use paid::PaidOrder;
pub use range::{RangeSelector, Selection};
pub use render::{RenderStage, RenderedDocuments};
pub use retry::RetryPolicy;
