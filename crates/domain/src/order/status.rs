//! Order status and payment status state machines.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Kitchen/delivery progress of an order.
///
/// Transition table:
/// ```text
/// New ──┬──► Accepted ──┬──► Preparing ──► Delivering ──► Completed
///       │               │
///       ├───────────────┴──► Cancelled
///       └──► Expired
/// ```
///
/// The table is advisory: the lifecycle controller applies requests outside
/// it (manual admin overrides) and only logs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Just placed, waiting for payment and acceptance.
    #[default]
    New,

    /// Accepted by the restaurant.
    Accepted,

    /// Being cooked.
    Preparing,

    /// Handed to the courier.
    Delivering,

    /// Delivered (terminal state).
    Completed,

    /// Cancelled by an admin or the customer (terminal state).
    Cancelled,

    /// Not paid within the payment window (terminal state).
    Expired,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::New,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Delivering,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Expired,
    ];

    /// Returns the statuses reachable from this one according to the table.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::New => &[
                OrderStatus::Accepted,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::Accepted => &[OrderStatus::Preparing, OrderStatus::Cancelled],
            OrderStatus::Preparing => &[OrderStatus::Delivering],
            OrderStatus::Delivering => &[OrderStatus::Completed],
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired => &[],
        }
    }

    /// Returns true if `next` is listed in the transition table for this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// Payment progress of an order, independent of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Waiting for the provider to confirm.
    #[default]
    Pending,

    /// Confirmed by the provider.
    Paid,

    /// The provider reported the payment as canceled.
    #[serde(alias = "canceled")]
    Cancelled,

    /// The payment window elapsed.
    Expired,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}
