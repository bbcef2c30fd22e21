//! Payment error types.

use lifecycle::LifecycleError;
use thiserror::Error;

/// Errors that can occur while reconciling a webhook event.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The webhook body is not a usable payment event.
    #[error("Malformed payment event: {0}")]
    MalformedEvent(String),

    /// Applying the event to the order failed.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Errors returned by a notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP request could not be sent or completed.
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The receiving endpoint answered with a non-success status.
    #[error("Notification rejected with status {0}")]
    Rejected(u16),

    /// The sink is not available.
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
