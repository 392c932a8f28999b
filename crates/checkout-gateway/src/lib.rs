//! # checkout-gateway
//!
//! Hosted checkout gateways for storefront-checkout.
//!
//! 1. **MockGateway** - no upstream calls
//!    - Fabricated session ids and success indicators
//!    - Every status read reports a captured payment
//!    - Best for: local development, demos, tests
//!
//! 2. **MastercardGateway** - hosted checkout REST API
//!    - `INITIATE_CHECKOUT` sessions with merchant branding
//!    - Session retrieval for status reads
//!    - Best for: production
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_gateway::{build_gateway, GatewayKind};
//!
//! // CHECKOUT_GATEWAY=mastercard picks the real processor
//! let kind: GatewayKind = std::env::var("CHECKOUT_GATEWAY")
//!     .unwrap_or_default()
//!     .parse()?;
//! let gateway = build_gateway(kind)?;
//! ```

pub mod config;
pub mod mastercard;
pub mod mock;

pub use config::MastercardConfig;
pub use mastercard::{MastercardGateway, MASTERCARD_PROVIDER};
pub use mock::{MockGateway, MOCK_PROVIDER};

use checkout_core::{BoxedCheckoutGateway, CheckoutResult};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Which processor backs the checkout service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayKind {
    #[default]
    Mock,
    Mastercard,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown checkout gateway '{0}' (expected mock or mastercard)")]
pub struct UnknownGateway(pub String);

impl FromStr for GatewayKind {
    type Err = UnknownGateway;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mock" => Ok(GatewayKind::Mock),
            "mastercard" | "mpgs" => Ok(GatewayKind::Mastercard),
            other => Err(UnknownGateway(other.to_string())),
        }
    }
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Mock => MOCK_PROVIDER,
            GatewayKind::Mastercard => MASTERCARD_PROVIDER,
        }
    }
}

/// Build the gateway for `kind`, reading credentials from the environment
pub fn build_gateway(kind: GatewayKind) -> CheckoutResult<BoxedCheckoutGateway> {
    Ok(match kind {
        GatewayKind::Mock => Arc::new(MockGateway::new()),
        GatewayKind::Mastercard => Arc::new(MastercardGateway::from_env()?),
    })
}
