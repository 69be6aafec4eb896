//! Rolling-window submission ceiling.
//!
//! The vendor accepts at most `limit` new orders per rolling `window`.
//! Callers over the ceiling wait in FIFO order for the oldest submission to
//! age out. At most `max_backlog` callers may wait at once; the next one is
//! rejected with [`PipelineError::SubmissionRateExceeded`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use unwritten_core::error::PipelineError;
use unwritten_core::ports::{PrintOrderRequest, PrintProvider};
use unwritten_core::types::OrderId;

use crate::config::{RpiConfig, DEFAULT_WINDOW};

pub struct SubmissionThrottle {
    limit: usize,
    window: Duration,
    max_backlog: usize,
    /// Start times of submissions inside the current window, oldest first.
    sent: Mutex<VecDeque<Instant>>,
    /// Callers currently inside `acquire`.
    waiting: AtomicUsize,
    /// Fair lock; tokio's mutex grants in request order.
    turnstile: Mutex<()>,
}

/// Decrements the waiting count when an `acquire` call ends, however it
/// ends.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SubmissionThrottle {
    pub fn new(limit: usize, window: Duration, max_backlog: usize) -> Self {
        Self {
            limit: limit.max(1),
            window,
            max_backlog,
            sent: Mutex::new(VecDeque::new()),
            waiting: AtomicUsize::new(0),
            turnstile: Mutex::new(()),
        }
    }

    pub fn from_config(config: &RpiConfig) -> Self {
        Self::new(config.daily_order_limit, DEFAULT_WINDOW, config.max_backlog)
    }

    /// Number of callers currently queued or passing through.
    pub fn backlog(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Wait for a submission slot. Returns the slot's timestamp, which can
    /// be handed back with [`refund`](Self::refund) if the submission never
    /// reached the vendor.
    pub async fn acquire(&self) -> Result<Instant, PipelineError> {
        let ahead = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _guard = WaitingGuard(&self.waiting);
        if ahead >= self.max_backlog && !self.has_free_slot().await {
            tracing::warn!(backlog = ahead, "Print submission backlog full");
            return Err(PipelineError::SubmissionRateExceeded { backlog: ahead });
        }

        let _turn = self.turnstile.lock().await;
        loop {
            let now = Instant::now();
            let mut sent = self.sent.lock().await;
            self.prune(&mut sent, now);
            if sent.len() < self.limit {
                sent.push_back(now);
                return Ok(now);
            }

            let Some(oldest) = sent.front().copied() else {
                continue;
            };
            drop(sent);
            let ready_at = oldest + self.window;
            tracing::info!(
                wait_secs = ready_at.saturating_duration_since(now).as_secs(),
                "Print submission ceiling reached, queuing"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }

    /// Return a slot taken by [`acquire`](Self::acquire).
    pub async fn refund(&self, slot: Instant) {
        let mut sent = self.sent.lock().await;
        if let Some(pos) = sent.iter().position(|t| *t == slot) {
            sent.remove(pos);
        }
    }

    async fn has_free_slot(&self) -> bool {
        let mut sent = self.sent.lock().await;
        self.prune(&mut sent, Instant::now());
        sent.len() < self.limit
    }

    fn prune(&self, sent: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = sent.front() {
            if now.saturating_duration_since(*front) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ThrottledProvider
// ---------------------------------------------------------------------------

/// A [`PrintProvider`] whose submissions pass through a
/// [`SubmissionThrottle`].
///
/// A rejected submission gives its slot back. Any other failure may have
/// reached the vendor, so the slot stays counted and is held for the order:
/// a retry with the same idempotency key reuses it instead of taking a new
/// one.
pub struct ThrottledProvider {
    inner: Arc<dyn PrintProvider>,
    throttle: Arc<SubmissionThrottle>,
    held: Mutex<HashMap<OrderId, Instant>>,
}

impl ThrottledProvider {
    pub fn new(inner: Arc<dyn PrintProvider>, throttle: Arc<SubmissionThrottle>) -> Self {
        Self {
            inner,
            throttle,
            held: Mutex::new(HashMap::new()),
        }
    }

    async fn take_held(&self, id: &OrderId) -> Option<Instant> {
        let window = self.throttle.window;
        let mut held = self.held.lock().await;
        held.retain(|_, slot| slot.elapsed() < window);
        held.remove(id)
    }
}

#[async_trait]
impl PrintProvider for ThrottledProvider {
    async fn create_order(&self, request: &PrintOrderRequest) -> Result<String, PipelineError> {
        let slot = match self.take_held(&request.idempotency_key).await {
            Some(slot) => {
                tracing::debug!(
                    order_id = %request.idempotency_key,
                    "Reusing held submission slot"
                );
                slot
            }
            None => self.throttle.acquire().await?,
        };

        match self.inner.create_order(request).await {
            Ok(id) => Ok(id),
            Err(e @ PipelineError::Provider(_)) => {
                self.throttle.refund(slot).await;
                Err(e)
            }
            Err(e) => {
                self.held
                    .lock()
                    .await
                    .insert(request.idempotency_key.clone(), slot);
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
