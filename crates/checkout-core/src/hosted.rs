//! # Hosted Checkout Payloads
//!
//! Wire shapes exchanged with the hosted checkout processor and echoed to
//! the storefront. Field names follow the processor's camelCase JSON.

use crate::gateway::CallbackUrls;
use crate::merchant::{DisplayControl, MerchantAddress, MerchantProfile};
use crate::money::Currency;
use crate::order::OrderDescriptor;
use serde::{Deserialize, Serialize};

/// Seconds a hosted payment page stays usable
pub const SESSION_TIMEOUT_SECS: u64 = 1800;

/// Processor API version the payloads are written against
pub const API_VERSION: &str = "67";

/// Session handle returned by the processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub update_status: String,
    #[serde(default)]
    pub version: String,
}

/// Merchant block of the interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantInfo {
    pub name: String,
    pub address: MerchantAddress,
}

/// How the payment page behaves and where it sends the customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub merchant: MerchantInfo,
    pub display_control: DisplayControl,
    pub timeout: u64,
    pub timeout_url: String,
    pub cancel_url: String,
    pub return_url: String,
}

impl Interaction {
    pub fn new(merchant: &MerchantProfile, urls: &CallbackUrls, order_id: &str) -> Self {
        Self {
            merchant: MerchantInfo {
                name: merchant.name.clone(),
                address: merchant.address.clone(),
            },
            display_control: merchant.display_control.clone(),
            timeout: SESSION_TIMEOUT_SECS,
            timeout_url: urls.timeout_url(order_id),
            cancel_url: urls.cancel_url(order_id),
            return_url: urls.return_url(order_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub unit_tax_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    pub amount: f64,
    pub currency: Currency,
    pub description: String,
    pub item: Vec<OrderItem>,
}

impl From<&OrderDescriptor> for OrderInfo {
    fn from(order: &OrderDescriptor) -> Self {
        Self {
            id: order.order_id.clone(),
            amount: order.amount(),
            currency: order.currency(),
            description: order.description.clone(),
            item: vec![OrderItem {
                name: order.description.clone(),
                quantity: 1,
                unit_price: order.amount(),
                unit_tax_amount: 0.0,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl From<&OrderDescriptor> for CustomerInfo {
    fn from(order: &OrderDescriptor) -> Self {
        let (first_name, last_name) = order.customer_name_parts();
        Self {
            email: order.customer_email.clone(),
            first_name,
            last_name,
        }
    }
}

/// Everything the storefront needs to open the hosted payment page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedSession {
    pub session: SessionInfo,
    pub success_indicator: String,
    pub interaction: Interaction,
    pub order: OrderInfo,
    pub customer: CustomerInfo,
}

impl HostedSession {
    pub fn session_id(&self) -> &str {
        &self.session.id
    }
}

/// Outcome of a payment as reported by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl ReportedStatus {
    /// Map a processor order status (`CAPTURED`, `DECLINED`, ...) onto ours
    pub fn from_order_status(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "CAPTURED" | "AUTHORIZED" | "PARTIALLY_CAPTURED" => ReportedStatus::Completed,
            "CANCELLED" | "VOIDED" => ReportedStatus::Cancelled,
            "FAILED" | "DECLINED" | "EXPIRED" => ReportedStatus::Failed,
            _ => ReportedStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionVersion {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusInfo {
    pub status: String,
    pub total_authorized_amount: f64,
    pub total_captured_amount: f64,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub frequency: String,
    pub amount: f64,
    pub currency: Currency,
    pub result: String,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub session: SessionVersion,
    pub order: OrderStatusInfo,
    pub transaction: Vec<TransactionRecord>,
}

/// Status read result: a summary status plus the full snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatusReport {
    pub status: ReportedStatus,
    pub data: StatusSnapshot,
}
