use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Order, OrderDraft, OrderPatch, OrderStatus};

use crate::Result;

/// Core trait for order store implementations.
///
/// The store owns id assignment and serialization of line items; callers only
/// see fully materialized [`Order`] values. Mutating methods return the
/// updated order, or `None` when no order has the given id. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and assigns it the next id.
    ///
    /// The returned order has `status = new` and `payment_status = pending`.
    async fn create(&self, draft: OrderDraft) -> Result<Order>;

    /// Retrieves an order by id.
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Sets the status of an order and bumps `updated_at`.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>>;

    /// Applies a partial update to an order.
    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Option<Order>>;

    /// Retrieves all orders placed by a user, newest first.
    async fn get_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Retrieves all orders, newest first.
    async fn list(&self) -> Result<Vec<Order>>;
}
