use std::time::Duration;

use unwritten_core::entry::DEFAULT_MAX_RANGE_DAYS;
use unwritten_core::error::CoreError;

const DEFAULT_ORDER_EXPIRY_HOURS: i64 = 24;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_MAX_CONCURRENT_RENDERS: usize = 2;

/// Order pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Longest date range a book may cover, in days.
    pub max_range_days: i64,
    /// Unpaid orders older than this are expired by the sweeper.
    pub order_expiry: chrono::Duration,
    /// Interval between expiry/recovery sweeps.
    pub sweep_interval: Duration,
    /// Renders allowed to run at once across all orders.
    pub max_concurrent_renders: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
            order_expiry: chrono::Duration::hours(DEFAULT_ORDER_EXPIRY_HOURS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_concurrent_renders: DEFAULT_MAX_CONCURRENT_RENDERS,
        }
    }
}

impl PipelineConfig {
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `MAX_RANGE_DAYS`         | `366`   |
    /// | `ORDER_EXPIRY_HOURS`     | `24`    |
    /// | `SWEEP_INTERVAL_SECS`    | `300`   |
    /// | `MAX_CONCURRENT_RENDERS` | `2`     |
    pub fn from_env() -> Result<Self, CoreError> {
        let max_range_days: i64 = parse_or("MAX_RANGE_DAYS", DEFAULT_MAX_RANGE_DAYS)?;
        let expiry_hours: i64 = parse_or("ORDER_EXPIRY_HOURS", DEFAULT_ORDER_EXPIRY_HOURS)?;
        let sweep_secs: u64 = parse_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let max_concurrent_renders: usize =
            parse_or("MAX_CONCURRENT_RENDERS", DEFAULT_MAX_CONCURRENT_RENDERS)?;

        if max_range_days < 1 || expiry_hours < 1 || sweep_secs == 0 || max_concurrent_renders == 0
        {
            return Err(CoreError::Validation(
                "MAX_RANGE_DAYS, ORDER_EXPIRY_HOURS, SWEEP_INTERVAL_SECS and \
                 MAX_CONCURRENT_RENDERS must be positive"
                    .into(),
            ));
        }

        Ok(Self {
            max_range_days,
            order_expiry: chrono::Duration::hours(expiry_hours),
            sweep_interval: Duration::from_secs(sweep_secs),
            max_concurrent_renders,
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
