//! Bounded exponential backoff for transient pipeline failures.
//!
//! A step is attempted once, then retried after each delay in the policy
//! (1 s, 2 s, 4 s by default). Only errors for which
//! [`PipelineError::is_retryable`] holds are retried. Every attempt and
//! every wait races the order's [`CancellationToken`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use unwritten_core::error::PipelineError;
use unwritten_core::types::OrderId;

/// Retry delays in seconds.
pub const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect())
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// Total attempts including the first.
    pub fn attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `op` until it succeeds, fails permanently, or the policy is
    /// exhausted. Returns the last error in the latter two cases and
    /// [`PipelineError::Cancelled`] if `cancel` fires first.
    pub async fn run<T, F, Fut>(
        &self,
        step: &str,
        order_id: &OrderId,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut delays = self.delays.iter();
        let mut attempt = 1usize;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled(order_id.clone())),
                result = op() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            let Some(delay) = delays.next() else {
                tracing::warn!(
                    order_id = %order_id,
                    step,
                    attempts = attempt,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(err);
            };

            tracing::warn!(
                order_id = %order_id,
                step,
                attempt,
                delay_secs = delay.as_secs(),
                error = %err,
                "Transient failure, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled(order_id.clone())),
                _ = tokio::time::sleep(*delay) => {}
            }
            attempt += 1;
        }
    }
}
