//! The persisted order record.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{CustomerDetails, LineItem, OrderStatus, PaymentStatus, Totals};

/// An order as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    pub status: OrderStatus,
    pub payment_status: PaymentStatus,

    /// Ordered line items, immutable after creation.
    pub items: Vec<LineItem>,
    pub totals: Totals,

    #[serde(flatten)]
    pub customer: CustomerDetails,

    /// Provider payment id, present once the payment is confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a draft under the id the store assigned to it.
    pub fn from_draft(id: OrderId, draft: OrderDraft) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            status: OrderStatus::New,
            payment_status: PaymentStatus::Pending,
            items: draft.items,
            totals: draft.totals,
            customer: draft.customer,
            payment_id: None,
            created_at: draft.created_at,
            updated_at: draft.created_at,
            expires_at: draft.expires_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.is_paid()
    }

    /// Applies a partial update in place.
    pub fn apply_patch(&mut self, patch: OrderPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(payment_status) = patch.payment_status {
            self.payment_status = payment_status;
        }
        if let Some(payment_id) = patch.payment_id {
            self.payment_id = Some(payment_id);
        }
        self.updated_at = patch.updated_at;
    }
}

/// A validated order that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: Option<UserId>,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub customer: CustomerDetails,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Partial update of the mutable order fields.
///
/// `updated_at` is always written; the other fields only when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OrderPatch {
    /// Creates a patch that only bumps `updated_at`.
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            payment_status: None,
            payment_id: None,
            updated_at,
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }
}
