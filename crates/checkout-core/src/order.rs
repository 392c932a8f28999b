//! # Order Types
//!
//! The inbound checkout request and the validated order it becomes.

use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{Currency, Price};
use serde::{Deserialize, Serialize};

/// Default description when the caller sends none
pub const DEFAULT_DESCRIPTION: &str = "Online Purchase";

/// Raw checkout initiation request as posted by the storefront.
///
/// Every field is optional at this level so that validation, not the
/// deserializer, decides what a bad request looks like.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitCheckoutRequest {
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub order_id: Option<serde_json::Value>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A validated order handed to the gateway. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDescriptor {
    pub order_id: String,
    pub price: Price,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub description: String,
}

impl OrderDescriptor {
    /// Currency of the order
    pub fn currency(&self) -> Currency {
        self.price.currency
    }

    /// Decimal amount of the order
    pub fn amount(&self) -> f64 {
        self.price.as_decimal()
    }

    /// Split the customer name into first and rest.
    ///
    /// `"Ada Lovelace King"` becomes `("Ada", "Lovelace King")`.
    pub fn customer_name_parts(&self) -> (String, String) {
        let name = self.customer_name.as_deref().unwrap_or("").trim();
        let mut words = name.split_whitespace();
        let first = words.next().unwrap_or("").to_string();
        let rest = words.collect::<Vec<_>>().join(" ");
        (first, rest)
    }
}

impl TryFrom<InitCheckoutRequest> for OrderDescriptor {
    type Error = CheckoutError;

    fn try_from(request: InitCheckoutRequest) -> CheckoutResult<Self> {
        let amount = parse_amount(request.amount.as_ref())?;

        let order_id = parse_order_id(request.order_id.as_ref())?;

        let currency = match request.currency.as_deref() {
            Some(code) if !code.trim().is_empty() => code.parse::<Currency>()?,
            _ => Currency::default(),
        };

        let price = Price::new(amount, currency);
        if !price.is_positive() {
            return Err(CheckoutError::validation("Invalid amount"));
        }

        let description = request
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Ok(Self {
            order_id,
            price,
            customer_email: request.customer_email.filter(|e| !e.is_empty()),
            customer_name: request.customer_name.filter(|n| !n.is_empty()),
            description,
        })
    }
}

/// Accepts a JSON number, or a numeric string as forms tend to send.
fn parse_amount(value: Option<&serde_json::Value>) -> CheckoutResult<f64> {
    let amount = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(a) if a.is_finite() && a > 0.0 => Ok(a),
        _ => Err(CheckoutError::validation("Invalid amount")),
    }
}

/// Accepts a string or a JSON number, normalised to its text form.
fn parse_order_id(value: Option<&serde_json::Value>) -> CheckoutResult<String> {
    let order_id = match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if order_id.is_empty() {
        return Err(CheckoutError::validation("Order ID is required"));
    }
    Ok(order_id)
}
