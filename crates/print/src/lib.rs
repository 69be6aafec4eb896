//! Print provider client.
//!
//! - [`RpiClient`]: thin wrapper around the vendor's create-order API.
//! - [`SubmissionThrottle`]: rolling-window ceiling on new orders with a
//!   bounded FIFO backlog.
//! - [`ThrottledProvider`]: any [`PrintProvider`] behind a throttle.
//!
//! [`PrintProvider`]: unwritten_core::ports::PrintProvider

pub mod client;
pub mod config;
pub mod throttle;

pub use client::{PrintApiError, RpiClient};
pub use config::RpiConfig;
pub use throttle::{SubmissionThrottle, ThrottledProvider};
