//! Order wire types.
//!
//! [`OrderPayload`] is the JSON body posted to `<api-base>/api/orders`;
//! [`OrderAck`] is what the client extracts from the reply.

use serde::{Deserialize, Serialize};

/// Arabic label sent for cash-on-delivery orders.
pub const CASH_ON_DELIVERY_LABEL: &str = "الدفع عند الاستلام";
/// Arabic label sent for Vodafone Cash orders.
pub const VODAFONE_CASH_LABEL: &str = "فودافون كاش";
/// Frequency label for orders that do not repeat.
pub const ONE_OFF_LABEL: &str = "مرة واحدة";

/// Customer contact details, trimmed by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    /// Transfer to the store's Vodafone Cash wallet. Both fields are
    /// required.
    VodafoneCash { sender: String, reference: String },
}

impl PaymentMethod {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => CASH_ON_DELIVERY_LABEL,
            PaymentMethod::VodafoneCash { .. } => VODAFONE_CASH_LABEL,
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/orders
// ---------------------------------------------------------------------------

/// Request body for `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    /// One `"<emoji> <name> <qty> <unit>"` line per item.
    pub details: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total_price: f64,
    /// RFC 3339 timestamp.
    pub expected_ready_at: String,
    pub payment_method: String,
    pub payment_ref: String,
    pub vodafone_sender: String,
    pub vodafone_target: String,
    pub is_recurring: bool,
    /// Delivery interval for recurring orders, `0` otherwise.
    pub repeat_every_days: u32,
    /// `YYYY-MM-DD` of the next delivery for recurring orders, empty
    /// otherwise.
    pub next_date: String,
}

/// What the client keeps from a successful order reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Server-assigned order id, if the reply carried one.
    pub order_id: Option<String>,
    pub message: Option<String>,
}

/// Loose shape of the order endpoint's JSON reply.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrderResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub order_id: Option<serde_json::Value>,
    #[serde(default)]
    pub order: Option<serde_json::Value>,
}

impl OrderResponse {
    pub(crate) fn order_id(&self) -> Option<String> {
        let nested = self.order.as_ref().and_then(|o| o.get("id"));
        [self.order_id.as_ref(), self.id.as_ref(), nested]
            .into_iter()
            .flatten()
            .find_map(|v| match v {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}
