//! # Mastercard Gateway Configuration
//!
//! Credentials and endpoint for the hosted checkout REST API.
//! All secrets are loaded from environment variables.

use checkout_core::{CheckoutError, CheckoutResult, API_VERSION};
use std::env;

const DEFAULT_GATEWAY_URL: &str = "https://ap-gateway.mastercard.com";

/// Hosted checkout API configuration
#[derive(Clone)]
pub struct MastercardConfig {
    /// Merchant id assigned by the acquirer
    pub merchant_id: String,

    /// API password from the merchant administration portal
    pub api_password: String,

    /// Gateway base URL (for regional gateways and testing)
    pub gateway_url: String,

    /// REST API version
    pub api_version: String,
}

impl MastercardConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `MPGS_MERCHANT_ID`
    /// - `MPGS_API_PASSWORD`
    ///
    /// Optional: `MPGS_GATEWAY_URL`, `MPGS_API_VERSION`.
    pub fn from_env() -> CheckoutResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> CheckoutResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let merchant_id = lookup("MPGS_MERCHANT_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CheckoutError::Configuration("MPGS_MERCHANT_ID not set".to_string()))?;

        let api_password = lookup("MPGS_API_PASSWORD")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CheckoutError::Configuration("MPGS_API_PASSWORD not set".to_string()))?;

        if !merchant_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CheckoutError::Configuration(
                "MPGS_MERCHANT_ID must be alphanumeric".to_string(),
            ));
        }

        let gateway_url = lookup("MPGS_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        if !gateway_url.starts_with("https://") && !gateway_url.starts_with("http://") {
            return Err(CheckoutError::Configuration(
                "MPGS_GATEWAY_URL must be an http(s) URL".to_string(),
            ));
        }

        Ok(Self {
            merchant_id,
            api_password,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            api_version: lookup("MPGS_API_VERSION").unwrap_or_else(|| API_VERSION.to_string()),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(merchant_id: impl Into<String>, api_password: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            api_password: api_password.into(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            api_version: API_VERSION.to_string(),
        }
    }

    /// Merchant-scoped API root
    pub fn merchant_url(&self) -> String {
        format!(
            "{}/api/rest/version/{}/merchant/{}",
            self.gateway_url, self.api_version, self.merchant_id
        )
    }

    /// Basic-auth user name expected by the gateway
    pub fn api_username(&self) -> String {
        format!("merchant.{}", self.merchant_id)
    }

    /// Test merchants are prefixed `TEST` by the gateway
    pub fn is_test_mode(&self) -> bool {
        self.merchant_id.starts_with("TEST")
    }

    /// Builder: set custom gateway URL (for testing)
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for MastercardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastercardConfig")
            .field("merchant_id", &self.merchant_id)
            .field("api_password", &"***")
            .field("gateway_url", &self.gateway_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}
