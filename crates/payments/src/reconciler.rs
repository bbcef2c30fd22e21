//! Applies payment webhook events to orders.

use std::sync::Arc;

use common::OrderId;
use domain::{Money, Order};
use lifecycle::{LifecycleError, OrderLifecycle, PaymentCancellation, PaymentConfirmation};
use order_store::OrderStore;

use crate::error::{PaymentError, Result};
use crate::notifier::{NotificationKind, Notifier};
use crate::webhook::{PaymentAmount, PaymentEvent, WebhookPayload};

/// What a webhook event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order is now paid and the notifier was called.
    Paid(OrderId),
    /// The order had already been paid; nothing changed.
    AlreadyPaid(OrderId),
    /// The payment was recorded as cancelled.
    PaymentCancelled(OrderId),
    /// A cancellation arrived for a paid order and was dropped.
    CancelIgnored(OrderId),
    /// The event names an order that does not exist.
    OrderMissing(OrderId),
    /// An event this service does not act on.
    Ignored(String),
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid(_) => "paid",
            Self::AlreadyPaid(_) => "already_paid",
            Self::PaymentCancelled(_) => "payment_cancelled",
            Self::CancelIgnored(_) => "cancel_ignored",
            Self::OrderMissing(_) => "order_missing",
            Self::Ignored(_) => "ignored",
        }
    }
}

/// Turns provider webhook events into lifecycle operations.
pub struct PaymentReconciler<S: OrderStore> {
    lifecycle: OrderLifecycle<S>,
    notifier: Arc<dyn Notifier>,
    currency: String,
}

impl<S: OrderStore> Clone for PaymentReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            notifier: Arc::clone(&self.notifier),
            currency: self.currency.clone(),
        }
    }
}

impl<S: OrderStore + 'static> PaymentReconciler<S> {
    /// Creates a reconciler expecting payments in `currency`.
    pub fn new(
        lifecycle: OrderLifecycle<S>,
        notifier: Arc<dyn Notifier>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            notifier,
            currency: currency.into(),
        }
    }

    pub fn lifecycle(&self) -> &OrderLifecycle<S> {
        &self.lifecycle
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Parses and applies a raw webhook body.
    ///
    /// Every call is counted under `webhook_events_total`, labelled with the
    /// outcome, or with `malformed`/`error` on failure.
    pub async fn handle_webhook(&self, body: &[u8]) -> Result<ReconcileOutcome> {
        let result = match WebhookPayload::from_slice(body) {
            Ok(payload) => self.reconcile(payload).await,
            Err(e) => Err(e),
        };

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(PaymentError::MalformedEvent(_)) => "malformed",
            Err(PaymentError::Lifecycle(_)) => "error",
        };
        metrics::counter!("webhook_events_total", "outcome" => label).increment(1);

        match &result {
            Err(PaymentError::MalformedEvent(reason)) => {
                tracing::warn!(%reason, "dropping malformed webhook");
            }
            Err(e) => tracing::error!(error = %e, "webhook reconciliation failed"),
            Ok(_) => {}
        }
        result
    }

    /// Applies one parsed webhook.
    #[tracing::instrument(skip(self, payload), fields(event = %payload.event))]
    pub async fn reconcile(&self, payload: WebhookPayload) -> Result<ReconcileOutcome> {
        match payload.into_event()? {
            PaymentEvent::Succeeded {
                order_id,
                payment_id,
                amount,
            } => {
                self.payment_succeeded(order_id, payment_id.as_deref(), amount)
                    .await
            }
            PaymentEvent::Canceled { order_id } => self.payment_canceled(order_id).await,
            PaymentEvent::Other(event) => {
                tracing::debug!(%event, "ignoring webhook event");
                Ok(ReconcileOutcome::Ignored(event))
            }
        }
    }

    async fn payment_succeeded(
        &self,
        order_id: OrderId,
        payment_id: Option<&str>,
        amount: Option<PaymentAmount>,
    ) -> Result<ReconcileOutcome> {
        let confirmation = match self.lifecycle.confirm_payment(order_id, payment_id).await {
            Ok(confirmation) => confirmation,
            Err(LifecycleError::NotFound(_)) => {
                tracing::warn!(%order_id, ?payment_id, "payment for unknown order dropped");
                return Ok(ReconcileOutcome::OrderMissing(order_id));
            }
            Err(e) => return Err(e.into()),
        };

        match confirmation {
            PaymentConfirmation::Applied(order) => {
                if let Some(amount) = &amount {
                    self.check_amount(&order, amount);
                }
                self.notify(&order, NotificationKind::PaymentSucceeded).await;
                Ok(ReconcileOutcome::Paid(order_id))
            }
            PaymentConfirmation::AlreadyPaid(_) => Ok(ReconcileOutcome::AlreadyPaid(order_id)),
        }
    }

    async fn payment_canceled(&self, order_id: OrderId) -> Result<ReconcileOutcome> {
        match self.lifecycle.cancel_payment(order_id).await {
            Ok(PaymentCancellation::Applied(_)) => Ok(ReconcileOutcome::PaymentCancelled(order_id)),
            Ok(PaymentCancellation::IgnoredPaid(_)) => Ok(ReconcileOutcome::CancelIgnored(order_id)),
            Err(LifecycleError::NotFound(_)) => {
                tracing::warn!(%order_id, "cancellation for unknown order dropped");
                Ok(ReconcileOutcome::OrderMissing(order_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mismatches are reported, never enforced.
    fn check_amount(&self, order: &Order, amount: &PaymentAmount) {
        if let Some(currency) = amount.currency.as_deref()
            && !currency.eq_ignore_ascii_case(&self.currency)
        {
            tracing::warn!(
                order_id = %order.id,
                expected = %self.currency,
                received = currency,
                "payment currency mismatch"
            );
        }

        match amount.whole_units().map(Money::new) {
            Some(paid) if paid != order.totals.total => tracing::warn!(
                order_id = %order.id,
                expected = %order.totals.total,
                received = %paid,
                "payment amount mismatch"
            ),
            Some(_) => {}
            None => tracing::debug!(order_id = %order.id, value = %amount.value, "amount not in whole units"),
        }
    }

    async fn notify(&self, order: &Order, kind: NotificationKind) {
        if let Err(e) = self.notifier.notify(order, kind).await {
            metrics::counter!("notification_failures_total").increment(1);
            tracing::warn!(order_id = %order.id, %kind, error = %e, "notification failed");
        }
    }
}
