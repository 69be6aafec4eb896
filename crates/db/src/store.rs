//! `OrderStore` adapter over Postgres.

use async_trait::async_trait;
use unwritten_core::error::PipelineError;
use unwritten_core::order::{Order, OrderStatus, OrderUpdate};
use unwritten_core::ports::OrderStore;
use unwritten_core::types::OrderId;

use crate::models::order::OrderRow;
use crate::models::status::{order_status_id, StatusId};
use crate::repositories::order_repo::{OrderRepo, TransitionColumns};
use crate::DbPool;

/// Postgres-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn store_error(err: sqlx::Error) -> PipelineError {
    PipelineError::Store(err.to_string())
}

fn rows_into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, PipelineError> {
    rows.into_iter()
        .map(|row| row.into_order().map_err(PipelineError::from))
        .collect()
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), PipelineError> {
        let row = OrderRow::from_order(order)?;
        match OrderRepo::insert(&self.pool, &row).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                PipelineError::Validation(format!("Order {} already exists", order.id)),
            ),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, PipelineError> {
        OrderRepo::find_by_id(&self.pool, id.as_str())
            .await
            .map_err(store_error)?
            .map(|row| row.into_order().map_err(PipelineError::from))
            .transpose()
    }

    async fn transition(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, PipelineError> {
        let artifacts = update
            .artifacts
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| PipelineError::Store(format!("Cannot encode artifacts: {e}")))?;
        let columns = TransitionColumns {
            payment_token: update.payment_token.as_deref(),
            artifacts: artifacts.as_ref(),
            provider_order_id: update.provider_order_id.as_deref(),
            tracking_number: update.tracking.as_ref().map(|t| t.number.as_str()),
            tracking_url: update.tracking.as_ref().and_then(|t| t.url.as_deref()),
            last_error: update.last_error.as_deref(),
        };

        OrderRepo::transition(
            &self.pool,
            id.as_str(),
            order_status_id(expected),
            order_status_id(update.status),
            &columns,
        )
        .await
        .map_err(store_error)?
        .map(|row| row.into_order().map_err(PipelineError::from))
        .transpose()
    }

    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, PipelineError> {
        let ids: Vec<StatusId> = statuses.iter().copied().map(order_status_id).collect();
        let rows = OrderRepo::list_by_status(&self.pool, &ids)
            .await
            .map_err(store_error)?;
        rows_into_orders(rows)
    }
}
