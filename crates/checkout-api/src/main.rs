//! # Storefront Checkout
//!
//! Hosted checkout session service.
//!
//! ## Usage
//!
//! ```bash
//! # Mock gateway (default)
//! storefront-checkout
//!
//! # Real processor
//! export CHECKOUT_GATEWAY=mastercard
//! export MPGS_MERCHANT_ID=TESTMERCHANT
//! export MPGS_API_PASSWORD=...
//! storefront-checkout
//! ```

use checkout_api::{routes, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Checkout gateway: {}", state.checkout.provider_name());
    info!("Uploads directory: {}", state.uploads_dir().display());

    if is_prod && state.checkout.provider_name() == "mock" {
        warn!("Production is running against the mock gateway");
    }

    let app = routes::create_router(state);

    info!("🛒 Storefront checkout starting on http://{}", addr);

    if !is_prod {
        info!("💳 Init checkout: POST http://{}/api/payment/init-checkout", addr);
        info!("🔎 Status: GET http://{}/api/payment/init-checkout?sessionId=...", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  🛒 Storefront Checkout 🛒
  ━━━━━━━━━━━━━━━━━━━━━━━━━
  Hosted payment sessions
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
