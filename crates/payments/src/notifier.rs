//! Outbound order notifications.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::Order;
use serde::Serialize;

use crate::error::NotifyError;

/// What happened to the order being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    PaymentSucceeded,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::PaymentSucceeded => "payment_succeeded",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for order notifications (staff chat relay, logs, tests).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order: &Order, kind: NotificationKind) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, order: &Order, kind: NotificationKind) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id,
            %kind,
            status = %order.status,
            payment_status = %order.payment_status,
            total = %order.totals.total,
            customer = %order.customer.customer_name,
            "order notification"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct NotificationBody<'a> {
    event: NotificationKind,
    order: &'a Order,
}

/// POSTs `{ event, order }` as JSON to a relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, order: &Order, kind: NotificationKind) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&NotificationBody { event: kind, order })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        tracing::debug!(order_id = %order.id, %kind, "notification delivered");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    sent: Mutex<Vec<(OrderId, NotificationKind)>>,
    fail: AtomicBool,
}

/// Keeps notifications in memory for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Recorded>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail with [`NotifyError::Unavailable`].
    pub fn set_failing(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(OrderId, NotificationKind)> {
        self.inner
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of notifications of `kind` recorded for `order_id`.
    pub fn count(&self, order_id: OrderId, kind: NotificationKind) -> usize {
        self.sent()
            .iter()
            .filter(|(id, k)| *id == order_id && *k == kind)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, order: &Order, kind: NotificationKind) -> Result<(), NotifyError> {
        if self.inner.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("recording notifier set to fail".into()));
        }
        self.inner
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((order.id, kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{CustomerDetails, LineItem, Money, OrderDraft, Totals};

    fn order(id: u64) -> Order {
        let items = vec![LineItem::new("Tea", Money::new(90), 2)];
        let now = Utc::now();
        Order::from_draft(
            OrderId::new(id),
            OrderDraft {
                user_id: None,
                totals: Totals::compute(&items, Money::zero()).unwrap(),
                items,
                customer: CustomerDetails::default(),
                created_at: now,
                expires_at: now,
            },
        )
    }

    #[tokio::test]
    async fn test_recording_notifier_records_and_fails() {
        let notifier = RecordingNotifier::new();
        notifier
            .notify(&order(1), NotificationKind::PaymentSucceeded)
            .await
            .unwrap();
        assert_eq!(notifier.count(OrderId::new(1), NotificationKind::PaymentSucceeded), 1);
        assert_eq!(notifier.count(OrderId::new(1), NotificationKind::OrderCreated), 0);

        notifier.set_failing(true);
        let err = notifier
            .notify(&order(2), NotificationKind::OrderCreated)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Unavailable(_)));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        LogNotifier
            .notify(&order(1), NotificationKind::OrderCreated)
            .await
            .unwrap();
    }

    #[test]
    fn test_notification_body_shape() {
        let order = order(5);
        let body = serde_json::to_value(NotificationBody {
            event: NotificationKind::PaymentSucceeded,
            order: &order,
        })
        .unwrap();
        assert_eq!(body["event"], "payment_succeeded");
        assert_eq!(body["order"]["id"], 5);
        assert_eq!(body["order"]["totals"]["total"], 180);
    }

    #[tokio::test]
    async fn test_http_notifier_reports_unreachable_endpoint() {
        let notifier = HttpNotifier::new("http://127.0.0.1:9/notify").unwrap();
        let err = notifier
            .notify(&order(1), NotificationKind::OrderCreated)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
    }
}
