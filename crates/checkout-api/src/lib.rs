//! # checkout-api
//!
//! HTTP API layer for storefront-checkout.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for hosted checkout sessions
//! - Landing pages for the processor's return, cancel and timeout redirects
//! - Main-image upload
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/payment/init-checkout` | Open hosted checkout session |
//! | GET | `/api/payment/init-checkout?sessionId=` | Session status |
//! | GET | `/checkout/success` | Return landing |
//! | GET | `/checkout` | Cancel / timeout landing |
//! | POST | `/api/upload/main-image` | Upload image |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, ConfigError};
