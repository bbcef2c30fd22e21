//! Order lifecycle controller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{NewOrder, Order, OrderPatch, OrderStatus, PaymentStatus};
use order_store::OrderStore;

use crate::error::{LifecycleError, Result};
use crate::locks::OrderLocks;
use crate::timers::ExpiryTimers;

/// Default payment window for a new order.
pub const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// How long an unpaid order stays open before it auto-expires.
    pub order_timeout: Duration,
}

impl LifecycleConfig {
    pub fn with_order_timeout(order_timeout: Duration) -> Self {
        Self { order_timeout }
    }

    /// The payment window as a calendar duration, saturating on overflow.
    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.order_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            order_timeout: DEFAULT_ORDER_TIMEOUT,
        }
    }
}

/// Result of applying a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentConfirmation {
    /// The order moved to `paid`.
    Applied(Order),
    /// The order was already paid; nothing changed.
    AlreadyPaid(Order),
}

/// Result of applying a canceled payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCancellation {
    /// The payment status moved to `cancelled`.
    Applied(Order),
    /// The order is paid; a late cancellation does not downgrade it.
    IgnoredPaid(Order),
}

/// What an expiry check did to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The order was unpaid and is now expired.
    Expired(Order),
    /// Payment won the race; the order was left untouched.
    SkippedPaid,
    /// The order had already reached a terminal status.
    SkippedTerminal(OrderStatus),
    /// The order no longer exists.
    Missing,
}

struct Inner<S> {
    store: S,
    timers: ExpiryTimers,
    locks: OrderLocks,
    config: LifecycleConfig,
}

/// Single authority over order status, payment status and expiry timers.
///
/// Every read-check-write on an order runs under that order's lock, so a
/// payment webhook, a status change and a firing timer never interleave on
/// the same order. Clones share state.
pub struct OrderLifecycle<S: OrderStore> {
    inner: Arc<Inner<S>>,
}

impl<S: OrderStore> Clone for OrderLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: OrderStore + 'static> OrderLifecycle<S> {
    /// Creates a lifecycle controller over the given store.
    pub fn new(store: S, config: LifecycleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                timers: ExpiryTimers::new(),
                locks: OrderLocks::new(),
                config,
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn timers(&self) -> &ExpiryTimers {
        &self.inner.timers
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// Persists a new order and arms its expiry timer.
    #[tracing::instrument(skip(self, new_order))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let draft = new_order.into_draft(Utc::now(), self.inner.config.expiry_window())?;
        let order = self.inner.store.create(draft).await?;

        self.arm_expiry(order.id);

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            total = %order.totals.total,
            expires_at = %order.expires_at,
            "order created"
        );
        Ok(order)
    }

    /// Moves an order to `status`.
    ///
    /// Requests outside the transition table are applied and logged. A
    /// terminal target disarms the expiry timer before the write.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let current = self
            .inner
            .store
            .get_by_id(order_id)
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        if status == OrderStatus::Expired && current.is_paid() {
            return Err(LifecycleError::PaidOrderCannotExpire(order_id));
        }

        if current.status != status && !current.status.can_transition_to(status) {
            metrics::counter!("order_transitions_outside_table_total").increment(1);
            tracing::warn!(
                %order_id,
                from = %current.status,
                to = %status,
                "status transition outside the table, applying anyway"
            );
        }

        if status.is_terminal() && self.inner.timers.disarm(order_id) {
            tracing::debug!(%order_id, %status, "expiry timer disarmed on terminal status");
        }

        let updated = self
            .inner
            .store
            .update_status(order_id, status, Utc::now())
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(%order_id, from = %current.status, to = %status, "order status changed");
        Ok(updated)
    }

    /// Loads an order by id.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.store.get_by_id(order_id).await?)
    }

    /// Lists all orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.inner.store.list().await?)
    }

    /// Lists the orders of one customer, newest first.
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.inner.store.get_by_user_id(user_id).await?)
    }

    /// Marks an order as paid, recording the provider payment id when known.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        payment_id: Option<&str>,
    ) -> Result<PaymentConfirmation> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let order = self
            .inner
            .store
            .get_by_id(order_id)
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        // Must precede the paid write.
        self.inner.timers.disarm(order_id);

        if order.is_paid() {
            tracing::debug!(%order_id, "payment already recorded");
            return Ok(PaymentConfirmation::AlreadyPaid(order));
        }

        if order.is_terminal() {
            tracing::warn!(
                %order_id,
                status = %order.status,
                "payment confirmed for an order that is already closed"
            );
        }

        let mut patch = OrderPatch::at(Utc::now()).payment_status(PaymentStatus::Paid);
        match payment_id {
            Some(payment_id) => patch = patch.payment_id(payment_id),
            None => tracing::warn!(%order_id, "payment confirmed without a payment id"),
        }
        let paid = self
            .inner
            .store
            .update(order_id, patch)
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        metrics::counter!("payments_confirmed_total").increment(1);
        tracing::info!(%order_id, ?payment_id, "order paid");
        Ok(PaymentConfirmation::Applied(paid))
    }

    /// Records a canceled payment. The status and expiry timer are untouched.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment(&self, order_id: OrderId) -> Result<PaymentCancellation> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let order = self
            .inner
            .store
            .get_by_id(order_id)
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        if order.is_paid() {
            tracing::warn!(%order_id, "ignoring payment cancellation for a paid order");
            return Ok(PaymentCancellation::IgnoredPaid(order));
        }

        let patch = OrderPatch::at(Utc::now()).payment_status(PaymentStatus::Cancelled);
        let updated = self
            .inner
            .store
            .update(order_id, patch)
            .await?
            .ok_or(LifecycleError::NotFound(order_id))?;

        metrics::counter!("payments_cancelled_total").increment(1);
        tracing::info!(%order_id, "payment cancelled");
        Ok(PaymentCancellation::Applied(updated))
    }

    /// Expires an order unless it has been paid or already closed.
    ///
    /// This is what an expiry timer runs when it fires.
    #[tracing::instrument(skip(self))]
    pub async fn auto_expire(&self, order_id: OrderId) -> Result<ExpiryOutcome> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let Some(order) = self.inner.store.get_by_id(order_id).await? else {
            tracing::info!(%order_id, "order to expire no longer exists");
            return Ok(ExpiryOutcome::Missing);
        };

        if order.is_paid() {
            self.inner.timers.disarm(order_id);
            tracing::debug!(%order_id, "order paid before expiry");
            return Ok(ExpiryOutcome::SkippedPaid);
        }

        if order.is_terminal() {
            self.inner.timers.disarm(order_id);
            tracing::debug!(%order_id, status = %order.status, "order already closed");
            return Ok(ExpiryOutcome::SkippedTerminal(order.status));
        }

        let patch = OrderPatch::at(Utc::now())
            .status(OrderStatus::Expired)
            .payment_status(PaymentStatus::Expired);
        let Some(expired) = self.inner.store.update(order_id, patch).await? else {
            return Ok(ExpiryOutcome::Missing);
        };
        self.inner.timers.disarm(order_id);

        metrics::counter!("orders_expired_total").increment(1);
        tracing::info!(%order_id, "unpaid order expired");
        Ok(ExpiryOutcome::Expired(expired))
    }

    /// Cancels every armed timer. Returns how many were armed.
    ///
    /// Timers are not persisted, so orders still pending at shutdown will not
    /// expire after a restart.
    pub fn shutdown(&self) -> usize {
        let dropped = self.inner.timers.disarm_all();
        if dropped > 0 {
            tracing::warn!(dropped, "expiry timers dropped on shutdown");
        }
        dropped
    }

    fn arm_expiry(&self, order_id: OrderId) {
        let lifecycle = self.clone();
        self.inner
            .timers
            .arm(order_id, self.inner.config.order_timeout, move |id| async move {
                match lifecycle.auto_expire(id).await {
                    Ok(outcome) => tracing::debug!(order_id = %id, ?outcome, "expiry handled"),
                    Err(e) => tracing::error!(order_id = %id, error = %e, "auto-expire failed"),
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CustomerDetails, LineItem, Money};
    use order_store::InMemoryOrderStore;

    const TIMEOUT: Duration = Duration::from_secs(30 * 60);

    fn lifecycle() -> OrderLifecycle<InMemoryOrderStore> {
        OrderLifecycle::new(
            InMemoryOrderStore::new(),
            LifecycleConfig::with_order_timeout(TIMEOUT),
        )
    }

    fn new_order(total: i64) -> NewOrder {
        NewOrder {
            user_id: Some(UserId::new(77)),
            customer: CustomerDetails {
                customer_name: "Maria".to_string(),
                phone: "+79005554433".to_string(),
                address: "Sadovaya 8".to_string(),
                ..Default::default()
            },
            items: vec![LineItem::new("Set", Money::new(total), 1)],
            delivery_fee: Money::zero(),
        }
    }

    #[test]
    fn test_default_timeout_is_thirty_minutes() {
        let config = LifecycleConfig::default();
        assert_eq!(config.order_timeout, Duration::from_secs(1800));
        assert_eq!(config.expiry_window(), chrono::Duration::minutes(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_order_arms_timer() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(3500)).await.unwrap();

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.totals.total, Money::new(3500));
        assert_eq!(order.expires_at - order.created_at, chrono::Duration::minutes(30));
        assert!(lc.timers().is_armed(order.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_order_rejects_invalid_input() {
        let lc = lifecycle();
        let mut bad = new_order(100);
        bad.items.clear();

        let err = lc.create_order(bad).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidOrder(_)));
        assert_eq!(lc.timers().armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_status_unknown_order() {
        let lc = lifecycle();
        let err = lc
            .set_status(OrderId::new(42), OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(id) if id == OrderId::new(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_terminal_status_keeps_timer() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();

        let accepted = lc.set_status(order.id, OrderStatus::Accepted).await.unwrap();

        assert_eq!(accepted.status, OrderStatus::Accepted);
        assert!(lc.timers().is_armed(order.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_disarms_timer() {
        let lc = lifecycle();
        for status in [
            OrderStatus::Cancelled,
            OrderStatus::Expired,
            OrderStatus::Completed,
        ] {
            let order = lc.create_order(new_order(500)).await.unwrap();
            let updated = lc.set_status(order.id, status).await.unwrap();
            assert_eq!(updated.status, status);
            assert!(!lc.timers().is_armed(order.id), "{status} left a timer");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_outside_table_is_applied() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();
        lc.set_status(order.id, OrderStatus::Completed).await.unwrap();

        let reopened = lc.set_status(order.id, OrderStatus::New).await.unwrap();
        assert_eq!(reopened.status, OrderStatus::New);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_order_cannot_be_set_expired() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();
        lc.confirm_payment(order.id, Some("pay-1")).await.unwrap();

        let err = lc
            .set_status(order.id, OrderStatus::Expired)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PaidOrderCannotExpire(_)));

        let stored = lc.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::New);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_payment_disarms_and_records_id() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();

        let result = lc.confirm_payment(order.id, Some("pay-1")).await.unwrap();

        let PaymentConfirmation::Applied(paid) = result else {
            panic!("expected the payment to be applied");
        };
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_id.as_deref(), Some("pay-1"));
        assert_eq!(paid.status, OrderStatus::New);
        assert!(!lc.timers().is_armed(order.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_creates_armed_order() {
        let lc = OrderLifecycle::new(
            InMemoryOrderStore::new(),
            LifecycleConfig::with_order_timeout(Duration::from_secs(u64::MAX)),
        );

        let order = lc.create_order(new_order(500)).await.unwrap();

        assert!(lc.timers().is_armed(order.id));
        assert!(order.expires_at > order.created_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_payment_without_id_still_marks_paid() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();

        let result = lc.confirm_payment(order.id, None).await.unwrap();

        let PaymentConfirmation::Applied(paid) = result else {
            panic!("expected the payment to be applied");
        };
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(paid.payment_id.is_none());
        assert!(!lc.timers().is_armed(order.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_payment_twice_is_noop() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();

        lc.confirm_payment(order.id, Some("pay-1")).await.unwrap();
        let first = lc.get_order(order.id).await.unwrap().unwrap();
        let second = lc.confirm_payment(order.id, Some("pay-1")).await.unwrap();

        assert_eq!(second, PaymentConfirmation::AlreadyPaid(first.clone()));
        assert_eq!(lc.get_order(order.id).await.unwrap().unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_payment_keeps_status_and_timer() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();

        let PaymentCancellation::Applied(updated) = lc.cancel_payment(order.id).await.unwrap()
        else {
            panic!("expected the cancellation to be applied");
        };

        assert_eq!(updated.payment_status, PaymentStatus::Cancelled);
        assert_eq!(updated.status, OrderStatus::New);
        assert!(lc.timers().is_armed(order.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_payment_does_not_downgrade_paid() {
        let lc = lifecycle();
        let order = lc.create_order(new_order(500)).await.unwrap();
        lc.confirm_payment(order.id, Some("pay-1")).await.unwrap();

        let result = lc.cancel_payment(order.id).await.unwrap();
        assert!(matches!(result, PaymentCancellation::IgnoredPaid(_)));
        assert!(lc.get_order(order.id).await.unwrap().unwrap().is_paid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_expire_outcomes() {
        let lc = lifecycle();

        assert_eq!(
            lc.auto_expire(OrderId::new(99)).await.unwrap(),
            ExpiryOutcome::Missing
        );

        let paid = lc.create_order(new_order(500)).await.unwrap();
        lc.confirm_payment(paid.id, Some("pay-1")).await.unwrap();
        assert_eq!(
            lc.auto_expire(paid.id).await.unwrap(),
            ExpiryOutcome::SkippedPaid
        );

        let delivered = lc.create_order(new_order(500)).await.unwrap();
        lc.set_status(delivered.id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            lc.auto_expire(delivered.id).await.unwrap(),
            ExpiryOutcome::SkippedTerminal(OrderStatus::Completed)
        );

        let unpaid = lc.create_order(new_order(500)).await.unwrap();
        let ExpiryOutcome::Expired(expired) = lc.auto_expire(unpaid.id).await.unwrap() else {
            panic!("expected the unpaid order to expire");
        };
        assert_eq!(expired.status, OrderStatus::Expired);
        assert_eq!(expired.payment_status, PaymentStatus::Expired);
        assert!(!lc.timers().is_armed(unpaid.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_orders_newest_first() {
        let lc = lifecycle();
        lc.create_order(new_order(100)).await.unwrap();
        lc.create_order(new_order(200)).await.unwrap();

        let ids: Vec<u64> = lc
            .list_orders()
            .await
            .unwrap()
            .iter()
            .map(|o| o.id.value())
            .collect();
        assert_eq!(ids, vec![2, 1]);

        let mine = lc.list_orders_for_user(UserId::new(77)).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_timers() {
        let lc = lifecycle();
        lc.create_order(new_order(100)).await.unwrap();
        lc.create_order(new_order(200)).await.unwrap();

        assert_eq!(lc.shutdown(), 2);
        assert_eq!(lc.timers().armed_count(), 0);
    }
}
