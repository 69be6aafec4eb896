//! Domain core for the Unwritten print-book pipeline.
//!
//! This crate has zero internal deps. It owns the data model (entries,
//! manifests, orders), the pure layout engine, the print format catalog,
//! the order state machine, webhook signature checks, and the async ports
//! through which the pipeline talks to external services.

pub mod entry;
pub mod error;
pub mod format;
pub mod hashing;
pub mod layout;
pub mod manifest;
pub mod order;
pub mod ports;
pub mod prompts;
pub mod signing;
pub mod types;
