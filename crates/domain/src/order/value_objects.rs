//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Money amount in whole currency units.
///
/// Menu prices and delivery fees are whole numbers, so there is no fractional
/// part to carry around.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// A line in an order: a menu position, its unit price and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Display name of the dish.
    pub name: String,

    /// Price per unit.
    pub price: Money,

    /// Quantity ordered.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Returns `price * quantity`, or `None` if it does not fit.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// Order totals, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals for the given items and delivery fee.
    pub fn compute(items: &[LineItem], delivery_fee: Money) -> Result<Self, OrderError> {
        let subtotal = items.iter().try_fold(Money::zero(), |acc, item| {
            item.line_total().and_then(|line| acc.checked_add(line))
        });
        let subtotal = subtotal.ok_or(OrderError::AmountOverflow)?;
        let total = subtotal
            .checked_add(delivery_fee)
            .ok_or(OrderError::AmountOverflow)?;

        Ok(Self {
            subtotal,
            delivery_fee,
            total,
        })
    }
}

/// Customer-facing order metadata.
///
/// Shown to couriers and admins; never interpreted by the lifecycle logic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
