//! Per-order expiry timers.
//!
//! Each armed timer is a tokio task that sleeps for the requested delay and
//! then runs the expiry callback. The registry keeps at most one task per
//! order id; arming again aborts the previous task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::OrderId;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Stand-in deadline for delays too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct ArmedTimer {
    generation: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    armed: HashMap<OrderId, ArmedTimer>,
}

/// Registry of scheduled single-shot expiry callbacks, keyed by order id.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct ExpiryTimers {
    table: Arc<Mutex<TimerTable>>,
}

impl ExpiryTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedules `on_expire(order_id)` to run after `delay`.
    ///
    /// Any timer already armed for `order_id` is cancelled first.
    pub fn arm<F, Fut>(&self, order_id: OrderId, delay: Duration, on_expire: F)
    where
        F: FnOnce(OrderId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // The table lock is held until the new entry is inserted, so the
        // spawned task cannot claim before it exists, even with a zero delay.
        let mut table = self.table();
        if let Some(previous) = table.armed.remove(&order_id) {
            previous.handle.abort();
            tracing::debug!(%order_id, "replaced armed expiry timer");
        }

        table.next_generation += 1;
        let generation = table.next_generation;
        let now = Instant::now();
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let registry = self.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if registry.claim(order_id, generation) {
                tracing::debug!(%order_id, "expiry timer fired");
                on_expire(order_id).await;
            }
        });

        table.armed.insert(
            order_id,
            ArmedTimer {
                generation,
                deadline,
                handle,
            },
        );
        metrics::gauge!("expiry_timers_armed").set(table.armed.len() as f64);
    }

    /// Cancels the timer for `order_id`. Returns whether one was armed.
    ///
    /// A timer whose callback is already running has claimed its entry, so
    /// disarming from inside the callback is a no-op and never aborts it.
    pub fn disarm(&self, order_id: OrderId) -> bool {
        let mut table = self.table();
        let removed = table.armed.remove(&order_id);
        metrics::gauge!("expiry_timers_armed").set(table.armed.len() as f64);
        match removed {
            Some(timer) => {
                timer.handle.abort();
                tracing::debug!(%order_id, "expiry timer disarmed");
                true
            }
            None => false,
        }
    }

    /// Cancels every armed timer. Returns how many were armed.
    pub fn disarm_all(&self) -> usize {
        let mut table = self.table();
        let count = table.armed.len();
        for (_, timer) in table.armed.drain() {
            timer.handle.abort();
        }
        metrics::gauge!("expiry_timers_armed").set(0.0);
        count
    }

    pub fn is_armed(&self, order_id: OrderId) -> bool {
        self.table().armed.contains_key(&order_id)
    }

    pub fn armed_count(&self) -> usize {
        self.table().armed.len()
    }

    /// Returns when the armed timer for `order_id` is due, if any.
    pub fn deadline(&self, order_id: OrderId) -> Option<Instant> {
        self.table().armed.get(&order_id).map(|t| t.deadline)
    }

    /// Removes the entry of a firing timer if it is still the current one.
    fn claim(&self, order_id: OrderId, generation: u64) -> bool {
        let mut table = self.table();
        let current = table
            .armed
            .get(&order_id)
            .is_some_and(|t| t.generation == generation);
        if current {
            table.armed.remove(&order_id);
            metrics::gauge!("expiry_timers_armed").set(table.armed.len() as f64);
        }
        current
    }
}

impl std::fmt::Debug for ExpiryTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryTimers")
            .field("armed", &self.armed_count())
            .finish()
    }
}
