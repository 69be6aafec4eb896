use std::time::Duration;

use unwritten_core::error::CoreError;

/// Vendor ceiling on new orders per rolling window.
pub const DEFAULT_DAILY_ORDER_LIMIT: usize = 50;

/// Submissions allowed to wait for a slot before backpressure kicks in.
pub const DEFAULT_MAX_BACKLOG: usize = 350;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RpiConfig {
    /// Base URL including the API version, e.g. `https://host/api/v1`.
    pub api_url: String,
    pub api_key: String,
    pub daily_order_limit: usize,
    pub max_backlog: usize,
    pub request_timeout: Duration,
}

impl RpiConfig {
    /// | Variable                | Required | Default |
    /// |-------------------------|----------|---------|
    /// | `RPI_API_URL`           | yes      |         |
    /// | `RPI_API_KEY`           | yes      |         |
    /// | `RPI_DAILY_ORDER_LIMIT` | no       | `50`    |
    /// | `RPI_MAX_BACKLOG`       | no       | `350`   |
    /// | `RPI_TIMEOUT_SECS`      | no       | `30`    |
    pub fn from_env() -> Result<Self, CoreError> {
        let api_url = std::env::var("RPI_API_URL")
            .map_err(|_| CoreError::Validation("RPI_API_URL must be set".into()))?;
        let api_key = std::env::var("RPI_API_KEY")
            .map_err(|_| CoreError::Validation("RPI_API_KEY must be set".into()))?;

        let daily_order_limit = parse_or("RPI_DAILY_ORDER_LIMIT", DEFAULT_DAILY_ORDER_LIMIT)?;
        if daily_order_limit == 0 {
            return Err(CoreError::Validation(
                "RPI_DAILY_ORDER_LIMIT must be at least 1".into(),
            ));
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            daily_order_limit,
            max_backlog: parse_or("RPI_MAX_BACKLOG", DEFAULT_MAX_BACKLOG)?,
            request_timeout: Duration::from_secs(parse_or(
                "RPI_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
