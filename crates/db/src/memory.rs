//! In-process `OrderStore` used by tests and by local runs without
//! `DATABASE_URL`. Same compare-and-set semantics as the Postgres store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use unwritten_core::error::PipelineError;
use unwritten_core::order::{Order, OrderStatus, OrderUpdate};
use unwritten_core::ports::OrderStore;
use unwritten_core::types::OrderId;

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.lock().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), PipelineError> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.id) {
            return Err(PipelineError::Validation(format!(
                "Order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, PipelineError> {
        Ok(self.orders.lock().await.get(id).cloned())
    }

    async fn transition(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, PipelineError> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(id) {
            Some(order) if order.status == expected => {
                order.apply(update, Utc::now());
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, PipelineError> {
        let orders = self.orders.lock().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching)
    }
}
