//! # Checkout Gateway Trait
//!
//! Strategy trait for hosted checkout processors.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CheckoutGateway (trait)                   │
//! │  ├── initiate_checkout()                                    │
//! │  ├── session_status()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                 ┌──────────┴──────────┐
//!                 │                     │
//!         ┌───────┴───────┐   ┌─────────┴─────────┐
//!         │  MockGateway  │   │ MastercardGateway │
//!         └───────────────┘   └───────────────────┘
//! ```

use crate::error::CheckoutResult;
use crate::hosted::{HostedSession, Interaction, SessionStatusReport};
use crate::order::OrderDescriptor;
use async_trait::async_trait;
use std::sync::Arc;

/// A hosted checkout processor.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Open a hosted checkout session for `order`.
    ///
    /// `interaction` carries merchant display metadata, the timeout and the
    /// three callback URLs already parameterized with the order id.
    async fn initiate_checkout(
        &self,
        order: &OrderDescriptor,
        interaction: &Interaction,
    ) -> CheckoutResult<HostedSession>;

    /// Read the current status of a session.
    async fn session_status(&self, session_id: &str) -> CheckoutResult<SessionStatusReport>;

    /// Provider name (for logging and health output).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed gateway (dynamic dispatch)
pub type BoxedCheckoutGateway = Arc<dyn CheckoutGateway>;

/// Builds the timeout, cancel and return URLs handed to the processor
#[derive(Debug, Clone)]
pub struct CallbackUrls {
    /// Base URL of the storefront (e.g., "https://shop.example")
    pub base_url: String,
    /// Checkout page path, target of timeout and cancel
    pub checkout_path: String,
    /// Success page path
    pub success_path: String,
}

impl CallbackUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            checkout_path: "/checkout".to_string(),
            success_path: "/checkout/success".to_string(),
        }
    }

    pub fn timeout_url(&self, order_id: &str) -> String {
        format!(
            "{}{}?timeout=true&orderId={}",
            self.base_url,
            self.checkout_path,
            urlencoding::encode(order_id)
        )
    }

    pub fn cancel_url(&self, order_id: &str) -> String {
        format!(
            "{}{}?cancelled=true&orderId={}",
            self.base_url,
            self.checkout_path,
            urlencoding::encode(order_id)
        )
    }

    pub fn return_url(&self, order_id: &str) -> String {
        format!(
            "{}{}?orderId={}",
            self.base_url,
            self.success_path,
            urlencoding::encode(order_id)
        )
    }
}

impl Default for CallbackUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
