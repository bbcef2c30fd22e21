//! Order record, statuses and intake validation.

mod intake;
mod model;
mod status;
mod value_objects;

pub use intake::NewOrder;
pub use model::{Order, OrderDraft, OrderPatch};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{CustomerDetails, LineItem, Money, Totals};

use thiserror::Error;

/// Errors raised by order validation and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A required intake field is missing or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {name}: {quantity} (must be greater than 0)")]
    InvalidQuantity { name: String, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for {name}: {price} (must be greater than 0)")]
    InvalidPrice { name: String, price: i64 },

    #[error("Invalid delivery fee: {0}")]
    InvalidDeliveryFee(i64),

    /// Order amounts do not fit in the money type.
    #[error("Order total is too large")]
    AmountOverflow,

    /// A status string that matches no known status.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}
