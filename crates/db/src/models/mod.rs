//! Row models and status lookups.

pub mod order;
pub mod status;
