//! Domain layer for the order lifecycle service.
//!
//! This crate provides:
//! - the persisted [`Order`] record and its partial updates
//! - the status and payment-status state machines
//! - intake validation for new orders

pub mod order;

pub use common::{OrderId, UserId};
pub use order::{
    CustomerDetails, LineItem, Money, NewOrder, Order, OrderDraft, OrderError, OrderPatch,
    OrderStatus, PaymentStatus, Totals,
};
