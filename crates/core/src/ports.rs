//! Async ports to the external services the pipeline depends on.
//!
//! Every backend client is passed in explicitly as `Arc<dyn Port>`; adapters
//! live in `unwritten-cloud`, `unwritten-print`, and `unwritten-db`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entry::{Child, DateRange, PhotoRef, StoredEntry};
use crate::error::PipelineError;
use crate::order::{Order, OrderStatus, OrderUpdate, ShippingAddress};
use crate::types::{ChildId, OrderId};

/// Hosted journal backend: children, entries, and photo storage.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Look up a child; `Ok(None)` when the id is unknown.
    async fn find_child(&self, child_id: &ChildId) -> Result<Option<Child>, PipelineError>;

    /// Entries of `child_id` dated within `range` (inclusive), any order.
    async fn entries_between(
        &self,
        child_id: &ChildId,
        range: &DateRange,
    ) -> Result<Vec<StoredEntry>, PipelineError>;

    /// Public URL of a stored photo. No I/O.
    fn photo_url(&self, photo_path: &str) -> PhotoRef;
}

/// Durable, publicly fetchable blob storage for rendered documents.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `key`, overwriting, and return its public URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PipelineError>;
}

/// Downloads entry photos at render time.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, photo: &PhotoRef) -> Result<Vec<u8>, PipelineError>;
}

/// Create-order call to the print vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintOrderRequest {
    /// Always the order id, so a retried call cannot create a second job.
    pub idempotency_key: OrderId,
    pub external_id: OrderId,
    pub sku: String,
    pub quantity: u32,
    pub cover_url: String,
    pub guts_url: String,
    pub shipping: ShippingAddress,
}

/// Print vendor order API.
#[async_trait]
pub trait PrintProvider: Send + Sync {
    /// Submit an order and return the vendor's order id.
    async fn create_order(&self, request: &PrintOrderRequest) -> Result<String, PipelineError>;
}

/// Durable order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order. Fails if the id already exists.
    async fn insert(&self, order: &Order) -> Result<(), PipelineError>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, PipelineError>;

    /// Compare-and-set: apply `update` only if the stored status still equals
    /// `expected`. Returns the updated order, or `None` when the status moved
    /// (or the order does not exist).
    async fn transition(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, PipelineError>;

    /// Orders currently in any of `statuses`, oldest first.
    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, PipelineError>;
}
