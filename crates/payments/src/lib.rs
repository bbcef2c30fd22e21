//! Payment provider webhooks and order notifications.
//!
//! The provider reports the outcome of a payment by calling the webhook
//! endpoint with an event such as `payment.succeeded`. The
//! [`PaymentReconciler`] applies those events through the order lifecycle
//! and fires a [`Notifier`] once per newly paid order.

pub mod error;
pub mod notifier;
pub mod reconciler;
pub mod webhook;

pub use error::{NotifyError, PaymentError, Result};
pub use notifier::{HttpNotifier, LogNotifier, NotificationKind, Notifier, RecordingNotifier};
pub use reconciler::{PaymentReconciler, ReconcileOutcome};
pub use webhook::{PaymentAmount, PaymentEvent, WebhookPayload};
