use std::sync::Arc;

use unwritten_pipeline::OrderCoordinator;
use unwritten_print::SubmissionThrottle;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (secrets, CORS, timeouts).
    pub config: Arc<ServerConfig>,
    /// Owns every order status change.
    pub coordinator: Arc<OrderCoordinator>,
    /// Postgres pool, when orders are persisted in a database.
    pub pool: Option<unwritten_db::DbPool>,
    /// Provider submission throttle, reported by the health check.
    pub throttle: Option<Arc<SubmissionThrottle>>,
}
