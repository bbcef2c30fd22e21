//! Order intake: the data a customer submits and its validation.

use chrono::{DateTime, Duration, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use super::{CustomerDetails, LineItem, Money, OrderDraft, OrderError, Totals};

/// A new order as submitted by the Mini App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub user_id: Option<UserId>,

    #[serde(flatten)]
    pub customer: CustomerDetails,

    pub items: Vec<LineItem>,

    /// Zone-based delivery price, resolved by the caller.
    #[serde(default)]
    pub delivery_fee: Money,
}

impl NewOrder {
    /// Checks the fields the lifecycle relies on.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.customer.customer_name.trim().is_empty() {
            return Err(OrderError::MissingField("customerName"));
        }
        if self.customer.phone.trim().is_empty() {
            return Err(OrderError::MissingField("phone"));
        }
        if self.customer.address.trim().is_empty() {
            return Err(OrderError::MissingField("address"));
        }
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    name: item.name.clone(),
                    quantity: item.quantity,
                });
            }
            if !item.price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    name: item.name.clone(),
                    price: item.price.amount(),
                });
            }
        }
        if self.delivery_fee.is_negative() {
            return Err(OrderError::InvalidDeliveryFee(self.delivery_fee.amount()));
        }
        Ok(())
    }

    /// Validates and turns the submission into a draft expiring `timeout` after `now`.
    pub fn into_draft(self, now: DateTime<Utc>, timeout: Duration) -> Result<OrderDraft, OrderError> {
        self.validate()?;
        let totals = Totals::compute(&self.items, self.delivery_fee)?;
        Ok(OrderDraft {
            user_id: self.user_id,
            items: self.items,
            totals,
            customer: self.customer,
            created_at: now,
            expires_at: now
                .checked_add_signed(timeout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }
}
