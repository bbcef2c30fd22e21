use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{
    CustomerDetails, LineItem, Money, Order, OrderDraft, OrderPatch, OrderStatus, PaymentStatus,
    Totals,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Result, StoreError, store::OrderStore};

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, items, subtotal, delivery_fee, \
     total, customer_name, phone, address, delivery_zone, comment, payment_id, created_at, \
     updated_at, expires_at";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("order store migrations applied");
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let raw_id: i64 = row.try_get("id")?;
        let id = u64::try_from(raw_id)
            .map(OrderId::new)
            .map_err(|_| StoreError::CorruptRow {
                order_id: OrderId::new(0),
                reason: format!("negative id {raw_id}"),
            })?;
        let corrupt = |reason: String| StoreError::CorruptRow {
            order_id: id,
            reason,
        };

        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        let items: serde_json::Value = row.try_get("items")?;
        let items: Vec<LineItem> = serde_json::from_value(items)?;

        Ok(Order {
            id,
            user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| corrupt(e.to_string()))?,
            payment_status: payment_status
                .parse::<PaymentStatus>()
                .map_err(|e| corrupt(e.to_string()))?,
            items,
            totals: Totals {
                subtotal: Money::new(row.try_get("subtotal")?),
                delivery_fee: Money::new(row.try_get("delivery_fee")?),
                total: Money::new(row.try_get("total")?),
            },
            customer: CustomerDetails {
                customer_name: row.try_get("customer_name")?,
                phone: row.try_get("phone")?,
                address: row.try_get("address")?,
                delivery_zone: row.try_get("delivery_zone")?,
                comment: row.try_get("comment")?,
            },
            payment_id: row.try_get("payment_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn bind_id(id: OrderId) -> Option<i64> {
        i64::try_from(id.value()).ok()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order> {
        let items = serde_json::to_value(&draft.items)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, status, payment_status, items, subtotal, delivery_fee,
                                total, customer_name, phone, address, delivery_zone, comment,
                                created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, $14)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(draft.user_id.map(|u| u.value()))
        .bind(OrderStatus::New.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(items)
        .bind(draft.totals.subtotal.amount())
        .bind(draft.totals.delivery_fee.amount())
        .bind(draft.totals.total.amount())
        .bind(&draft.customer.customer_name)
        .bind(&draft.customer.phone)
        .bind(&draft.customer.address)
        .bind(&draft.customer.delivery_zone)
        .bind(&draft.customer.comment)
        .bind(draft.created_at)
        .bind(draft.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let Some(raw_id) = Self::bind_id(id) else {
            return Ok(None);
        };

        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(raw_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        self.update(id, OrderPatch::at(at).status(status)).await
    }

    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Option<Order>> {
        let Some(raw_id) = Self::bind_id(id) else {
            return Ok(None);
        };

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                payment_id = COALESCE($4, payment_id),
                updated_at = $5
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(raw_id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.payment_status.map(|s| s.as_str()))
        .bind(patch.payment_id)
        .bind(patch.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id DESC"
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
