//! Per-order mutual exclusion for read-check-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::OrderId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<OrderId, Arc<AsyncMutex<()>>>;

/// Hands out one async mutex per order id.
///
/// Entries are created on demand and removed when the last guard for an
/// order is released, so the table only holds orders with work in flight.
#[derive(Clone, Default)]
pub struct OrderLocks {
    table: Arc<Mutex<LockTable>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until no other task holds the lock for `order_id`.
    pub async fn acquire(&self, order_id: OrderId) -> OrderGuard {
        let lock = self.table().entry(order_id).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        OrderGuard {
            order_id,
            lock,
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Number of orders that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held for the duration of a critical section on one order.
pub struct OrderGuard {
    order_id: OrderId,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockTable>>,
}

impl OrderGuard {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        // Release the mutex before deciding whether the entry is still shared.
        drop(self.guard.take());
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.order_id);
        }
    }
}
