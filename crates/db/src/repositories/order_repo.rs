//! Repository for the `orders` table.
//!
//! Status changes go through `transition`, a compare-and-set on
//! `status_id`, so two writers racing on one order cannot both win.

use sqlx::PgPool;

use crate::models::order::OrderRow;
use crate::models::status::StatusId;

/// Column list for `orders` queries.
const COLUMNS: &str = "\
    id, child_id, contact_email, status_id, manifest, shipping, \
    payment_token, artifacts, provider_order_id, \
    tracking_number, tracking_url, last_error, \
    created_at, updated_at";

/// Column changes applied together with a status move. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct TransitionColumns<'a> {
    pub payment_token: Option<&'a str>,
    pub artifacts: Option<&'a serde_json::Value>,
    pub provider_order_id: Option<&'a str>,
    pub tracking_number: Option<&'a str>,
    pub tracking_url: Option<&'a str>,
    pub last_error: Option<&'a str>,
}

pub struct OrderRepo;

impl OrderRepo {
    pub async fn insert(pool: &PgPool, row: &OrderRow) -> Result<OrderRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO orders \
                 (id, child_id, contact_email, status_id, manifest, shipping, \
                  payment_token, artifacts, provider_order_id, \
                  tracking_number, tracking_url, last_error, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(&row.id)
            .bind(&row.child_id)
            .bind(&row.contact_email)
            .bind(row.status_id)
            .bind(&row.manifest)
            .bind(&row.shipping)
            .bind(&row.payment_token)
            .bind(&row.artifacts)
            .bind(&row.provider_order_id)
            .bind(&row.tracking_number)
            .bind(&row.tracking_url)
            .bind(&row.last_error)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<OrderRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move an order from `expected` to `next` if it is still in `expected`.
    ///
    /// Returns `None` when the status has already moved (or the id is
    /// unknown); the caller decides whether that is a duplicate or an error.
    pub async fn transition(
        pool: &PgPool,
        id: &str,
        expected: StatusId,
        next: StatusId,
        columns: &TransitionColumns<'_>,
    ) -> Result<Option<OrderRow>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET \
                 status_id = $3, \
                 payment_token = COALESCE($4, payment_token), \
                 artifacts = COALESCE($5, artifacts), \
                 provider_order_id = COALESCE($6, provider_order_id), \
                 tracking_number = COALESCE($7, tracking_number), \
                 tracking_url = COALESCE($8, tracking_url), \
                 last_error = COALESCE($9, last_error), \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .bind(expected)
            .bind(next)
            .bind(columns.payment_token)
            .bind(columns.artifacts)
            .bind(columns.provider_order_id)
            .bind(columns.tracking_number)
            .bind(columns.tracking_url)
            .bind(columns.last_error)
            .fetch_optional(pool)
            .await
    }

    /// Orders in any of `status_ids`, oldest first.
    pub async fn list_by_status(
        pool: &PgPool,
        status_ids: &[StatusId],
    ) -> Result<Vec<OrderRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders \
             WHERE status_id = ANY($1) \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(status_ids)
            .fetch_all(pool)
            .await
    }
}
