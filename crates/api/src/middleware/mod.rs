//! Request extractors that guard routes.
//!
//! - [`admin::AdminToken`] -- Requires the configured admin bearer token.

pub mod admin;
