use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Order, OrderDraft, OrderPatch, OrderStatus};
use tokio::sync::RwLock;

use crate::{Result, store::OrderStore};

#[derive(Debug, Default)]
struct Orders {
    by_id: BTreeMap<OrderId, Order>,
    last_id: u64,
}

/// In-memory order store.
///
/// Orders are kept in id order, so "newest first" is a reverse iteration.
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Orders>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.by_id.len()
    }

    /// Removes an order, the way an external retention job would.
    pub async fn remove(&self, id: OrderId) -> Option<Order> {
        self.orders.write().await.by_id.remove(&id)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order> {
        let mut orders = self.orders.write().await;
        orders.last_id += 1;
        let order = Order::from_draft(OrderId::new(orders.last_id), draft);
        orders.by_id.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.by_id.get(&id).cloned())
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
        let mut orders = self.orders.write().await;
        Ok(orders.by_id.get_mut(&id).map(|order| {
            order.apply_patch(patch);
            order.clone()
        }))
    }

    async fn get_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .by_id
            .values()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.by_id.values().rev().cloned().collect())
    }
}
