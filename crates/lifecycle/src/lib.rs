//! Order lifecycle: status changes, payment bookkeeping and auto-expiry.
//!
//! A pending order is expired automatically unless it is paid within the
//! configured window. [`OrderLifecycle`] owns the only path that mutates an
//! order, and [`ExpiryTimers`] holds at most one scheduled expiry per order.

pub mod controller;
pub mod error;
pub mod locks;
pub mod timers;

pub use controller::{
    DEFAULT_ORDER_TIMEOUT, ExpiryOutcome, LifecycleConfig, OrderLifecycle, PaymentCancellation,
    PaymentConfirmation,
};
pub use error::{LifecycleError, Result};
pub use locks::{OrderGuard, OrderLocks};
pub use timers::ExpiryTimers;
