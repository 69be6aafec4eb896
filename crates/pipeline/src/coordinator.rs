//! Order coordinator: the only component that changes an order's status.
//!
//! Every mutation of one order (payment confirmation, pipeline runs,
//! provider notifications, admin actions, expiry) runs under that order's
//! async mutex, and every status write is a compare-and-set against the
//! status just read. A pipeline run is cancellable through a per-order
//! [`CancellationToken`] derived from the coordinator's shutdown token.
//!
//! Lifecycle:
//!
//! ```text
//! created -> payment_confirmed -> rendering -> submitted -> accepted
//!         -> printing -> shipped -> delivered
//! created -> expired
//! any non-terminal -> failed
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use unwritten_core::entry::DateRange;
use unwritten_core::error::PipelineError;
use unwritten_core::format::FormatCatalog;
use unwritten_core::manifest::{BookManifest, CoverTemplate, FormatSelection};
use unwritten_core::order::{
    state_machine, ArtifactRecord, Order, OrderStatus, OrderUpdate, ProviderEvent,
    ShippingAddress, Tracking,
};
use unwritten_core::ports::{
    ArtifactStore, EntryStore, OrderStore, PhotoFetcher, PrintOrderRequest, PrintProvider,
};
use unwritten_core::types::{ChildId, OrderId, Timestamp};
use unwritten_events::bus::event_types;
use unwritten_events::{EventBus, OrderEvent};

use crate::config::PipelineConfig;
use crate::paid::PaidOrder;
use crate::range::RangeSelector;
use crate::render::RenderStage;
use crate::retry::RetryPolicy;

/// Lock entries are pruned once the map grows past this many orders.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// External services the coordinator drives.
#[derive(Clone)]
pub struct Services {
    pub entries: Arc<dyn EntryStore>,
    pub orders: Arc<dyn OrderStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub photos: Arc<dyn PhotoFetcher>,
    pub provider: Arc<dyn PrintProvider>,
    pub events: Arc<EventBus>,
    pub catalog: Arc<FormatCatalog>,
}

/// A customer's request for a book.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub child_id: ChildId,
    pub range: DateRange,
    pub format_key: String,
    pub cover_template: CoverTemplate,
    pub quantity: u32,
    pub contact_email: String,
    pub shipping: ShippingAddress,
}

/// Result of a payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order moved to `payment_confirmed`; its pipeline should run.
    Confirmed,
    /// Payment was already recorded. Nothing changed.
    Duplicate,
    UnknownOrder,
    /// The order can no longer be paid for (expired or failed unpaid).
    NotPayable(OrderStatus),
}

/// Result of a provider notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied(OrderStatus),
    /// Out of order, duplicate, or for an unknown order.
    Discarded,
}

pub struct OrderCoordinator {
    orders: Arc<dyn OrderStore>,
    provider: Arc<dyn PrintProvider>,
    events: Arc<EventBus>,
    catalog: Arc<FormatCatalog>,
    selector: RangeSelector,
    render: RenderStage,
    retry: RetryPolicy,
    config: PipelineConfig,
    locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
    /// Cancellation token and attached run count of each in-flight order.
    runs: Mutex<HashMap<OrderId, (CancellationToken, usize)>>,
    render_slots: Semaphore,
    shutdown: CancellationToken,
}

impl OrderCoordinator {
    pub fn new(services: Services, config: PipelineConfig) -> Self {
        Self {
            selector: RangeSelector::new(services.entries, config.max_range_days),
            render: RenderStage::new(services.artifacts, services.photos),
            orders: services.orders,
            provider: services.provider,
            events: services.events,
            catalog: services.catalog,
            retry: RetryPolicy::default(),
            render_slots: Semaphore::new(config.max_concurrent_renders),
            config,
            locks: Mutex::new(HashMap::new()),
            runs: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the backoff schedule for uploads, photo fetches and
    /// submissions.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.render = self.render.with_retry(retry.clone());
        self.retry = retry;
        self
    }

    pub fn with_max_artifact_bytes(mut self, max_bytes: u64) -> Self {
        self.render = self.render.with_max_artifact_bytes(max_bytes);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// Select entries, lay out the book and store the order as `created`.
    pub async fn create_order(&self, request: NewOrder) -> Result<Order, PipelineError> {
        request.shipping.check()?;
        let manifest = self
            .build_manifest(
                &request.child_id,
                request.range,
                &request.format_key,
                request.cover_template,
                request.quantity,
            )
            .await?;

        let order = Order::new(
            request.id,
            request.contact_email,
            manifest,
            request.shipping,
            Utc::now(),
        );
        self.orders.insert(&order).await?;

        tracing::info!(
            order_id = %order.id,
            child_id = %order.child_id,
            format = %order.manifest.format.profile.key,
            pages = order.manifest.page_count,
            "Order created"
        );
        self.events.publish(
            OrderEvent::new(event_types::ORDER_CREATED, order.id.clone())
                .with_contact(order.contact_email.clone())
                .with_payload(json!({ "page_count": order.manifest.page_count })),
        );
        Ok(order)
    }

    /// Lay out a book without creating an order.
    pub async fn preview(
        &self,
        child_id: &ChildId,
        range: DateRange,
        format_key: &str,
    ) -> Result<BookManifest, PipelineError> {
        self.build_manifest(child_id, range, format_key, CoverTemplate::default(), 1)
            .await
    }

    pub async fn get_order(&self, id: &OrderId) -> Result<Order, PipelineError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                entity: "Order",
                id: id.to_string(),
            })
    }

    async fn build_manifest(
        &self,
        child_id: &ChildId,
        range: DateRange,
        format_key: &str,
        cover_template: CoverTemplate,
        quantity: u32,
    ) -> Result<BookManifest, PipelineError> {
        let profile = self.catalog.get(format_key)?.clone();
        let format = FormatSelection::new(profile, cover_template, quantity)?;
        let selection = self.selector.select(child_id, &range).await?;
        BookManifest::build(&selection.child, range, format, &selection.entries)
    }

    // -----------------------------------------------------------------------
    // Payment
    // -----------------------------------------------------------------------

    /// Record an authenticated payment confirmation. Replays are no-ops.
    pub async fn confirm_payment(
        &self,
        id: &OrderId,
        confirmation_token: &str,
    ) -> Result<PaymentOutcome, PipelineError> {
        let _guard = self.lock_order(id).await;

        let Some(order) = self.orders.get(id).await? else {
            tracing::warn!(order_id = %id, "Payment confirmation for unknown order, ignoring");
            return Ok(PaymentOutcome::UnknownOrder);
        };

        match order.status {
            OrderStatus::Created => {
                let update = OrderUpdate::to(OrderStatus::PaymentConfirmed)
                    .with_payment_token(confirmation_token);
                let order = self.cas(&order, update).await?;
                tracing::info!(order_id = %id, "Payment confirmed");
                self.publish_status(&order, json!({}));
                Ok(PaymentOutcome::Confirmed)
            }
            _ if order.payment_token.is_some() => {
                tracing::info!(
                    order_id = %id,
                    status = %order.status,
                    "Duplicate payment confirmation, ignoring"
                );
                Ok(PaymentOutcome::Duplicate)
            }
            status => {
                tracing::warn!(
                    order_id = %id,
                    status = %status,
                    "Payment confirmation for an order that cannot be paid"
                );
                Ok(PaymentOutcome::NotPayable(status))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Run `id` on a background task.
    pub fn spawn_pipeline(self: &Arc<Self>, id: OrderId) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = coordinator.run_pipeline(&id).await {
                tracing::warn!(order_id = %id, error = %e, "Pipeline run ended early");
            }
        })
    }

    /// Spawn a run that is already attached to `cancel`.
    fn spawn_attached(self: &Arc<Self>, id: OrderId, cancel: CancellationToken) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let result = coordinator.drive(&id, &cancel).await;
            coordinator.detach_run(&id).await;
            match result {
                Ok(status) => tracing::debug!(order_id = %id, status = %status, "Resumed"),
                Err(e) => tracing::warn!(order_id = %id, error = %e, "Resume failed"),
            }
        })
    }

    /// Render and submit a paid order. Returns the status it was left in.
    ///
    /// Orders that are not `payment_confirmed` or `rendering` are left
    /// untouched. Recorded artifacts are reused, and the submission carries
    /// the order id as its idempotency key, so repeating a run is safe.
    pub async fn run_pipeline(&self, id: &OrderId) -> Result<OrderStatus, PipelineError> {
        let cancel = self.attach_run(id).await;
        let result = self.drive(id, &cancel).await;
        self.detach_run(id).await;
        result
    }

    async fn drive(
        &self,
        id: &OrderId,
        cancel: &CancellationToken,
    ) -> Result<OrderStatus, PipelineError> {
        let _guard = self.lock_order(id).await;

        let mut order = self.get_order(id).await?;
        if !order.status.is_pipeline_pending() {
            tracing::debug!(order_id = %id, status = %order.status, "Nothing to run");
            return Ok(order.status);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(id.clone()));
        }

        if order.status == OrderStatus::PaymentConfirmed {
            order = self.cas(&order, OrderUpdate::to(OrderStatus::Rendering)).await?;
            self.publish_status(&order, json!({}));
        }

        let artifacts = match order.artifacts.clone() {
            Some(artifacts) => {
                tracing::info!(order_id = %id, "Reusing recorded artifacts");
                artifacts
            }
            None => {
                let _slot = tokio::select! {
                    slot = self.render_slots.acquire() => {
                        slot.map_err(|_| PipelineError::Cancelled(id.clone()))?
                    }
                    () = cancel.cancelled() => return Err(PipelineError::Cancelled(id.clone())),
                };
                let paid = PaidOrder::new(order.clone());
                match self.render.render(&paid, cancel).await {
                    Ok(artifacts) => {
                        order = self
                            .cas(
                                &order,
                                OrderUpdate::to(OrderStatus::Rendering)
                                    .with_artifacts(artifacts.clone()),
                            )
                            .await?;
                        artifacts
                    }
                    Err(e) => return self.settle_failure(&order, e).await,
                }
            }
        };

        self.submit(&order, &artifacts, cancel).await
    }

    async fn submit(
        &self,
        order: &Order,
        artifacts: &ArtifactRecord,
        cancel: &CancellationToken,
    ) -> Result<OrderStatus, PipelineError> {
        let request = PrintOrderRequest {
            idempotency_key: order.id.clone(),
            external_id: order.id.clone(),
            sku: order.manifest.format.profile.sku.clone(),
            quantity: order.manifest.format.quantity,
            cover_url: artifacts.cover_url.clone(),
            guts_url: artifacts.interior_url.clone(),
            shipping: order.shipping.clone(),
        };

        let submitted = self
            .retry
            .run("submit", &order.id, cancel, || {
                self.provider.create_order(&request)
            })
            .await;

        match submitted {
            Ok(provider_order_id) => {
                let update = OrderUpdate::to(OrderStatus::Submitted)
                    .with_provider_order_id(provider_order_id.clone());
                let order = self.cas(order, update).await?;
                tracing::info!(
                    order_id = %order.id,
                    provider_order_id = %provider_order_id,
                    "Order submitted to print provider"
                );
                self.publish_status(&order, json!({ "provider_order_id": provider_order_id }));
                Ok(OrderStatus::Submitted)
            }
            Err(e) => self.settle_failure(order, e).await,
        }
    }

    /// Decide what a failed run leaves behind.
    ///
    /// Backpressure and exhausted transient failures keep the order in
    /// `rendering` for the recovery sweep; everything else fails it.
    async fn settle_failure(
        &self,
        order: &Order,
        err: PipelineError,
    ) -> Result<OrderStatus, PipelineError> {
        match err {
            PipelineError::Cancelled(_) => {
                tracing::info!(order_id = %order.id, "Pipeline run cancelled");
                Err(err)
            }
            PipelineError::SubmissionRateExceeded { backlog } => {
                tracing::warn!(
                    order_id = %order.id,
                    backlog,
                    "Print provider backlog full, order stays queued"
                );
                self.note_error(order, &err).await?;
                Ok(OrderStatus::Rendering)
            }
            _ if err.is_retryable() => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %err,
                    "Transient failure outlived retries, order stays queued"
                );
                self.note_error(order, &err).await?;
                Ok(OrderStatus::Rendering)
            }
            _ => {
                tracing::error!(order_id = %order.id, error = %err, "Order failed");
                self.fail(order, &err.to_string()).await?;
                Ok(OrderStatus::Failed)
            }
        }
    }

    async fn note_error(&self, order: &Order, err: &PipelineError) -> Result<(), PipelineError> {
        let update = OrderUpdate::to(order.status).with_error(err.to_string());
        self.cas(order, update).await.map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Provider notifications
    // -----------------------------------------------------------------------

    /// Apply a provider status notification for the order with
    /// `external_id`. Invalid moves are logged and discarded; status never
    /// regresses.
    pub async fn apply_provider_event(
        &self,
        external_id: &OrderId,
        event: ProviderEvent,
        tracking: Option<Tracking>,
    ) -> Result<EventOutcome, PipelineError> {
        let _guard = self.lock_order(external_id).await;

        let Some(order) = self.orders.get(external_id).await? else {
            tracing::warn!(
                order_id = %external_id,
                ?event,
                "Provider notification for unknown order, discarding"
            );
            return Ok(EventOutcome::Discarded);
        };

        let to = event.target_status();
        if !state_machine::provider_may_apply(order.status, to) {
            let err = PipelineError::InvalidTransition {
                order_id: order.id.clone(),
                from: order.status,
                to,
            };
            tracing::warn!(error = %err, "Discarding provider notification");
            return Ok(EventOutcome::Discarded);
        }

        let mut update = OrderUpdate::to(to);
        let mut payload = json!({});
        match to {
            OrderStatus::Shipped => {
                if let Some(tracking) = tracking {
                    payload = json!({
                        "tracking_number": tracking.number,
                        "tracking_url": tracking.url,
                    });
                    update = update.with_tracking(tracking);
                }
            }
            OrderStatus::Failed => {
                update = update.with_error("Rejected by the print provider");
            }
            _ => {}
        }

        let order = self.cas(&order, update).await?;
        tracing::info!(order_id = %order.id, status = %to, "Applied provider notification");
        self.publish_status(&order, payload);
        Ok(EventOutcome::Applied(to))
    }

    // -----------------------------------------------------------------------
    // Administrative actions
    // -----------------------------------------------------------------------

    /// Mark a non-terminal order `failed`, cancelling its in-flight run.
    /// A submission that already reached the provider is not retracted.
    pub async fn admin_fail(&self, id: &OrderId, reason: &str) -> Result<Order, PipelineError> {
        if let Some((token, _)) = self.runs.lock().await.get(id) {
            token.cancel();
        }

        let _guard = self.lock_order(id).await;
        let order = self.get_order(id).await?;
        let invalid = || PipelineError::InvalidTransition {
            order_id: order.id.clone(),
            from: order.status,
            to: OrderStatus::Failed,
        };
        if !state_machine::admin_may_fail(order.status) {
            return Err(invalid());
        }

        tracing::warn!(order_id = %id, from = %order.status, reason, "Order failed by admin");
        let update = OrderUpdate::to(OrderStatus::Failed).with_error(reason);
        let failed = self
            .orders
            .transition(&order.id, order.status, &update)
            .await?
            .ok_or_else(invalid)?;
        self.publish_status(&failed, json!({ "error": reason }));
        Ok(failed)
    }

    async fn fail(&self, order: &Order, reason: &str) -> Result<Order, PipelineError> {
        let order = self
            .cas(order, OrderUpdate::to(OrderStatus::Failed).with_error(reason))
            .await?;
        self.publish_status(&order, json!({ "error": reason }));
        Ok(order)
    }

    // -----------------------------------------------------------------------
    // Sweeps
    // -----------------------------------------------------------------------

    /// Move `created` orders older than the expiry window to `expired`.
    /// Returns how many were expired.
    pub async fn expire_stale(&self, now: Timestamp) -> Result<usize, PipelineError> {
        let cutoff = now - self.config.order_expiry;
        let stale: Vec<Order> = self
            .orders
            .list_by_status(&[OrderStatus::Created])
            .await?
            .into_iter()
            .filter(|o| o.created_at <= cutoff)
            .collect();

        let mut expired = 0;
        for order in stale {
            let _guard = self.lock_order(&order.id).await;
            let update = OrderUpdate::to(OrderStatus::Expired);
            if let Some(order) = self
                .orders
                .transition(&order.id, OrderStatus::Created, &update)
                .await?
            {
                tracing::info!(order_id = %order.id, "Unpaid order expired");
                self.publish_status(&order, json!({}));
                expired += 1;
            }
        }
        Ok(expired)
    }

    /// Start a background run for every paid order whose pipeline has not
    /// finished and is not already running. Returns the spawned runs without
    /// waiting on them.
    pub async fn resume_incomplete(
        self: &Arc<Self>,
    ) -> Result<Vec<JoinHandle<()>>, PipelineError> {
        let pending = self
            .orders
            .list_by_status(&[OrderStatus::PaymentConfirmed, OrderStatus::Rendering])
            .await?;

        let mut started = Vec::new();
        for order in pending {
            let cancel = {
                let mut runs = self.runs.lock().await;
                if runs.contains_key(&order.id) {
                    continue;
                }
                let token = self.shutdown.child_token();
                runs.insert(order.id.clone(), (token.clone(), 1));
                token
            };
            started.push(self.spawn_attached(order.id, cancel));
        }

        if !started.is_empty() {
            tracing::info!(count = started.len(), "Resuming incomplete orders");
        }
        Ok(started)
    }

    /// Run the expiry and recovery sweeps every `sweep_interval` until
    /// `cancel` fires. The first sweep runs immediately.
    pub async fn run_sweepers(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.sweep_interval);
        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            expiry_hours = self.config.order_expiry.num_hours(),
            "Order sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Order sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.expire_stale(Utc::now()).await {
                        Ok(0) => {}
                        Ok(expired) => tracing::info!(expired, "Expired unpaid orders"),
                        Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                    }
                    if let Err(e) = self.resume_incomplete().await {
                        tracing::error!(error = %e, "Recovery sweep failed");
                    }
                }
            }
        }
    }

    /// Cancel every in-flight run. Used at shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn lock_order(&self, id: &OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    async fn attach_run(&self, id: &OrderId) -> CancellationToken {
        let mut runs = self.runs.lock().await;
        let (token, count) = runs
            .entry(id.clone())
            .or_insert_with(|| (self.shutdown.child_token(), 0));
        *count += 1;
        token.clone()
    }

    async fn detach_run(&self, id: &OrderId) {
        let mut runs = self.runs.lock().await;
        if let Some((_, count)) = runs.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                runs.remove(id);
            }
        }
    }

    /// Compare-and-set from `order`'s current status. Same-status updates
    /// only change fields; anything else must be a valid transition.
    async fn cas(&self, order: &Order, update: OrderUpdate) -> Result<Order, PipelineError> {
        let invalid = || PipelineError::InvalidTransition {
            order_id: order.id.clone(),
            from: order.status,
            to: update.status,
        };
        if update.status != order.status
            && !state_machine::can_transition(order.status, update.status)
        {
            return Err(invalid());
        }
        self.orders
            .transition(&order.id, order.status, &update)
            .await?
            .ok_or_else(invalid)
    }

    fn publish_status(&self, order: &Order, payload: serde_json::Value) {
        self.events.publish(
            OrderEvent::status_changed(order.id.clone(), order.status)
                .with_contact(order.contact_email.clone())
                .with_payload(payload),
        );
    }
}
