//! # Merchant Configuration
//!
//! Display metadata shown on the hosted payment page.
//! Loaded from `config/merchant.toml`, with a demo default.

use crate::error::{CheckoutError, CheckoutResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Postal address printed on the payment page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state_province: String,
    pub postcode_zip: String,
    pub country: String,
}

/// Which fields the payment page asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayControl {
    #[serde(default = "mandatory")]
    pub billing_address: String,
    #[serde(default = "mandatory")]
    pub customer_email: String,
    #[serde(default = "show")]
    pub order_summary: String,
}

fn mandatory() -> String {
    "MANDATORY".to_string()
}

fn show() -> String {
    "SHOW".to_string()
}

impl Default for DisplayControl {
    fn default() -> Self {
        Self {
            billing_address: mandatory(),
            customer_email: mandatory(),
            order_summary: show(),
        }
    }
}

/// Merchant shown to the customer during checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub name: String,
    pub address: MerchantAddress,
    #[serde(default)]
    pub display_control: DisplayControl,
}

impl MerchantProfile {
    /// Builder-style constructor with default display control
    pub fn new(name: impl Into<String>, address: MerchantAddress) -> Self {
        Self {
            name: name.into(),
            address,
            display_control: DisplayControl::default(),
        }
    }

    /// Parse a profile from TOML text
    pub fn from_toml(content: &str) -> CheckoutResult<Self> {
        toml::from_str(content).map_err(|e| CheckoutError::Configuration(e.to_string()))
    }

    /// Load the first readable profile among `paths`, or the demo default
    pub fn load_or_default<P: AsRef<Path>>(paths: &[P]) -> CheckoutResult<Self> {
        for path in paths {
            let path = path.as_ref();
            if let Ok(content) = std::fs::read_to_string(path) {
                let profile = Self::from_toml(&content).map_err(|e| {
                    CheckoutError::Configuration(format!("{}: {}", path.display(), e))
                })?;
                tracing::info!("Loaded merchant profile from {}", path.display());
                return Ok(profile);
            }
        }

        tracing::warn!("No merchant profile found, using demo merchant");
        Ok(Self::default())
    }
}

impl Default for MerchantProfile {
    fn default() -> Self {
        Self::new(
            "Demo Electronics Store",
            MerchantAddress {
                line1: "123 Commerce Street".to_string(),
                line2: "Suite 100".to_string(),
                city: "Demo City".to_string(),
                state_province: "DC".to_string(),
                postcode_zip: "12345".to_string(),
                country: "USA".to_string(),
            },
        )
    }
}
