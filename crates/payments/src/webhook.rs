//! Provider webhook payloads.

use common::OrderId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PaymentError, Result};

pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const PAYMENT_CANCELED: &str = "payment.canceled";

/// Raw webhook body: `{ event, object }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,

    #[serde(default)]
    pub object: PaymentObject,
}

/// The payment the event refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentObject {
    /// Provider payment id.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub metadata: PaymentMetadata,

    #[serde(default)]
    pub amount: Option<PaymentAmount>,
}

/// Merchant metadata echoed back by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Sent as a string by the provider, but numbers are accepted too.
    #[serde(rename = "orderId", default)]
    pub order_id: Option<Value>,
}

/// Amount charged, as reported by the provider (e.g. `"3500.00"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub value: Value,

    #[serde(default)]
    pub currency: Option<String>,
}

impl PaymentAmount {
    /// The amount in whole currency units, if it has no fractional part.
    pub fn whole_units(&self) -> Option<i64> {
        match &self.value {
            Value::String(s) => {
                let s = s.trim();
                match s.split_once('.') {
                    Some((units, fraction)) if fraction.chars().all(|c| c == '0') => {
                        units.parse().ok()
                    }
                    Some(_) => None,
                    None => s.parse().ok(),
                }
            }
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }
}

/// A webhook reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Succeeded {
        order_id: OrderId,
        payment_id: Option<String>,
        amount: Option<PaymentAmount>,
    },
    Canceled {
        order_id: OrderId,
    },
    /// Any event this service does not act on.
    Other(String),
}

impl WebhookPayload {
    /// Parses a raw webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| PaymentError::MalformedEvent(e.to_string()))
    }

    /// Extracts the event, validating the fields it depends on.
    pub fn into_event(self) -> Result<PaymentEvent> {
        match self.event.as_str() {
            PAYMENT_SUCCEEDED => {
                let order_id = self.object.metadata.order_id()?;
                Ok(PaymentEvent::Succeeded {
                    order_id,
                    payment_id: self.object.id.filter(|id| !id.trim().is_empty()),
                    amount: self.object.amount,
                })
            }
            PAYMENT_CANCELED => Ok(PaymentEvent::Canceled {
                order_id: self.object.metadata.order_id()?,
            }),
            _ => Ok(PaymentEvent::Other(self.event)),
        }
    }
}

impl PaymentMetadata {
    fn order_id(&self) -> Result<OrderId> {
        match &self.order_id {
            Some(Value::String(s)) => s
                .parse()
                .map_err(|e| PaymentError::MalformedEvent(format!("metadata.orderId: {e}"))),
            Some(Value::Number(n)) => n.as_u64().map(OrderId::new).ok_or_else(|| {
                PaymentError::MalformedEvent(format!("metadata.orderId: invalid number {n}"))
            }),
            Some(other) => Err(PaymentError::MalformedEvent(format!(
                "metadata.orderId: unexpected value {other}"
            ))),
            None => Err(PaymentError::MalformedEvent(
                "missing metadata.orderId".to_string(),
            )),
        }
    }
}
