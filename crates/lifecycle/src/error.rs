//! Lifecycle error types.

use common::OrderId;
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

/// Errors returned by the order lifecycle controller.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No order has the given id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The intake data failed validation.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    /// A paid order was asked to move to `expired`.
    #[error("Order {0} is paid and cannot expire")]
    PaidOrderCannotExpire(OrderId),

    /// The order store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
