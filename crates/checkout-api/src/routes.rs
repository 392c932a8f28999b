//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Largest accepted image upload
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Create the main application router
///
/// Routes:
/// - Checkout API (also mounted without the `/api/payment` prefix):
///   - POST /api/payment/init-checkout - Open a hosted session
///   - GET  /api/payment/init-checkout?sessionId= - Session status
///
/// - Processor redirects:
///   - GET /checkout/success?orderId=&resultIndicator= - Return landing
///   - GET /checkout?cancelled=true&orderId= - Cancel landing
///   - GET /checkout?timeout=true&orderId= - Timeout landing
///
/// - Uploads:
///   - POST /api/upload/main-image - Multipart image upload
pub fn create_router(state: AppState) -> Router {
    // Storefront pages are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_api = get(handlers::checkout_status).post(handlers::init_checkout);

    let checkout_pages = Router::new()
        .route("/checkout", get(handlers::checkout_landing))
        .route("/checkout/success", get(handlers::checkout_success));

    let upload_routes = Router::new()
        .route("/main-image", post(handlers::upload_main_image))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route("/api/payment/init-checkout", checkout_api.clone())
        .route("/init-checkout", checkout_api)
        .nest("/api/upload", upload_routes)
        .merge(checkout_pages)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
