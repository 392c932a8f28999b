//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the checkout service, configuration, and upload location.

use checkout_core::{
    CallbackUrls, CheckoutService, InMemorySessionRepository, MerchantProfile,
};
use checkout_gateway::{build_gateway, GatewayKind, UnknownGateway};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Uploads land here on deployed hosts when `UPLOADS_DIR` is unset
const DEPLOYED_UPLOADS_DIR: &str = "/var/www/storefront/public";

/// Uploads land here in development when `UPLOADS_DIR` is unset
const LOCAL_UPLOADS_DIR: &str = "public";

/// Where the merchant profile is looked up, relative to the working directory
const MERCHANT_CONFIG_PATHS: [&str; 3] = [
    "config/merchant.toml",
    "../config/merchant.toml",
    "../../config/merchant.toml",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("Invalid bind address {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Gateway(#[from] UnknownGateway),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Directory uploaded images are written to
    pub uploads_dir: PathBuf,
    /// Processor backing the checkout
    pub gateway: GatewayKind,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => 8080,
        };

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let uploads_dir = lookup("UPLOADS_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_uploads_dir(&environment));

        let gateway = lookup("CHECKOUT_GATEWAY")
            .unwrap_or_default()
            .parse::<GatewayKind>()?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            base_url: lookup("BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            environment,
            uploads_dir,
            gateway,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Staging shares the production filesystem layout
    pub fn is_deployed(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "staging")
    }
}

fn default_uploads_dir(environment: &str) -> PathBuf {
    match environment {
        "production" | "staging" => PathBuf::from(DEPLOYED_UPLOADS_DIR),
        _ => PathBuf::from(LOCAL_UPLOADS_DIR),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle
    pub checkout: CheckoutService,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build state from the environment: gateway, merchant profile, repository
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let gateway = build_gateway(config.gateway)
            .map_err(|e| anyhow::anyhow!("Failed to initialize {} gateway: {}", config.gateway.as_str(), e))?;

        let merchant = MerchantProfile::load_or_default(&MERCHANT_CONFIG_PATHS)
            .map_err(|e| anyhow::anyhow!("Failed to load merchant profile: {}", e))?;

        let checkout = CheckoutService::new(
            gateway,
            Arc::new(InMemorySessionRepository::new()),
            merchant,
            CallbackUrls::new(&config.base_url),
        );

        Ok(Self::with_service(checkout, config))
    }

    /// Assemble state from parts (tests, embedding)
    pub fn with_service(checkout: CheckoutService, config: AppConfig) -> Self {
        Self {
            checkout,
            config: Arc::new(config),
        }
    }

    pub fn uploads_dir(&self) -> &std::path::Path {
        &self.config.uploads_dir
    }
}
