//! HTTP-level tests for the checkout API.
//!
//! Requests are driven through the full router with `oneshot`, backed by
//! the mock gateway and an in-memory session repository.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use checkout_api::{create_router, AppConfig, AppState};
use checkout_core::{
    CallbackUrls, CheckoutService, CheckoutSession, InMemorySessionRepository, MerchantProfile,
    SessionStatus,
};
use checkout_gateway::MockGateway;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "----storefront-test-boundary";

fn test_state(uploads_dir: &Path) -> AppState {
    let uploads = uploads_dir.display().to_string();
    let config = AppConfig::from_lookup(|key| match key {
        "BASE_URL" => Some("http://shop.test".to_string()),
        "UPLOADS_DIR" => Some(uploads.clone()),
        _ => None,
    })
    .unwrap();

    let checkout = CheckoutService::new(
        Arc::new(MockGateway::new()),
        Arc::new(InMemorySessionRepository::new()),
        MerchantProfile::default(),
        CallbackUrls::new(&config.base_url),
    );

    AppState::with_service(checkout, config)
}

fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload/main-image")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn initiate(state: &AppState, order_id: &str) -> Value {
    let body = json!({"amount": 100, "orderId": order_id}).to_string();
    let (status, json) = send_json(
        app(state),
        json_request(Method::POST, "/api/payment/init-checkout", &body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

async fn stored_status(state: &AppState, order_id: &str) -> SessionStatus {
    state
        .checkout
        .sessions()
        .find_by_order(order_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, json) = send_json(app(&state), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["gateway"], "mock");
}

#[tokio::test]
async fn test_init_checkout_returns_session() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let body = json!({
        "amount": "49.99",
        "currency": "eur",
        "orderId": "order_1",
        "customerEmail": "ada@example.com",
        "customerName": "Ada Lovelace"
    })
    .to_string();

    let (status, json) = send_json(
        app(&state),
        json_request(Method::POST, "/api/payment/init-checkout", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["sessionId"].as_str().unwrap().starts_with("session_"));
    assert!(json["successIndicator"]
        .as_str()
        .unwrap()
        .starts_with("order_1_success_"));
    assert_eq!(json["data"]["session"]["id"], json["sessionId"]);
    assert_eq!(json["data"]["order"]["currency"], "EUR");
    assert_eq!(json["data"]["order"]["description"], "Online Purchase");
    assert_eq!(json["data"]["customer"]["firstName"], "Ada");
    assert_eq!(json["data"]["interaction"]["timeout"], 1800);
    assert_eq!(
        json["data"]["interaction"]["returnUrl"],
        "http://shop.test/checkout/success?orderId=order_1"
    );
    assert_eq!(
        json["data"]["interaction"]["cancelUrl"],
        "http://shop.test/checkout?cancelled=true&orderId=order_1"
    );

    assert_eq!(stored_status(&state, "order_1").await, SessionStatus::Pending);
}

#[tokio::test]
async fn test_init_checkout_short_path() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let body = json!({"amount": 10, "orderId": "order_short"}).to_string();
    let (status, json) =
        send_json(app(&state), json_request(Method::POST, "/init-checkout", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_invalid_amount_has_no_side_effect() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    for body in [
        json!({"orderId": "order_1"}),
        json!({"amount": 0, "orderId": "order_1"}),
        json!({"amount": -5, "orderId": "order_1"}),
        json!({"amount": "abc", "orderId": "order_1"}),
    ] {
        let (status, json) = send_json(
            app(&state),
            json_request(Method::POST, "/api/payment/init-checkout", &body.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json["error"], "Invalid amount");
    }

    let stored = state.checkout.sessions().find_by_order("order_1").await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_numeric_order_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let body = json!({"amount": 10, "orderId": 123}).to_string();
    let (status, json) = send_json(
        app(&state),
        json_request(Method::POST, "/api/payment/init-checkout", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["order"]["id"], "123");
    assert_eq!(
        json["data"]["interaction"]["returnUrl"],
        "http://shop.test/checkout/success?orderId=123"
    );
    assert_eq!(stored_status(&state, "123").await, SessionStatus::Pending);
}

#[tokio::test]
async fn test_missing_order_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let body = json!({"amount": 100, "orderId": "   "}).to_string();
    let (status, json) = send_json(
        app(&state),
        json_request(Method::POST, "/api/payment/init-checkout", &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Order ID is required");
}

#[tokio::test]
async fn test_unsupported_currency() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let body = json!({"amount": 100, "orderId": "order_1", "currency": "XYZ"}).to_string();
    let (status, _) = send_json(
        app(&state),
        json_request(Method::POST, "/api/payment/init-checkout", &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, json) = send_json(
        app(&state),
        json_request(Method::POST, "/api/payment/init-checkout", "{not json"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid request body");
}

#[tokio::test]
async fn test_status_requires_session_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    for uri in ["/api/payment/init-checkout", "/api/payment/init-checkout?sessionId="] {
        let (status, json) = send_json(app(&state), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Session ID is required");
    }
}

#[tokio::test]
async fn test_status_rejects_path_like_session_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    for uri in [
        "/init-checkout?sessionId=..%2Forder%2Fvictim",
        "/api/payment/init-checkout?sessionId=abc%2F..",
        "/api/payment/init-checkout?sessionId=a%20b",
    ] {
        let (status, json) = send_json(app(&state), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
        assert_eq!(json["error"], "Invalid session ID");
    }
}

#[tokio::test]
async fn test_status_reports_completed() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, json) = send_json(
        app(&state),
        get("/api/payment/init-checkout?sessionId=abc"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["data"]["session"]["id"], "abc");
    assert_eq!(json["data"]["order"]["status"], "CAPTURED");
    assert_eq!(json["data"]["order"]["totalCapturedAmount"], 100.0);
    assert_eq!(json["data"]["transaction"][0]["type"], "PAYMENT");
}

#[tokio::test]
async fn test_status_of_expired_session() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    state
        .checkout
        .sessions()
        .insert(CheckoutSession::issued_at(
            "session_old",
            "order_old",
            "order_old_success_1",
            1800,
            Utc::now() - Duration::hours(1),
        ))
        .await
        .unwrap();

    let (status, _) = send_json(
        app(&state),
        get("/init-checkout?sessionId=session_old"),
    )
    .await;

    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_return_with_matching_indicator() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let initiated = initiate(&state, "order_7").await;
    let indicator = initiated["successIndicator"].as_str().unwrap();

    let uri = format!(
        "/checkout/success?orderId=order_7&resultIndicator={}",
        indicator
    );
    let (status, body) = send(app(&state), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("order_7"));
    assert_eq!(stored_status(&state, "order_7").await, SessionStatus::Success);

    // A repeated redirect is harmless
    let (status, _) = send(app(&state), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_return_with_forged_indicator() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    initiate(&state, "order_8").await;

    let (status, _) = send(
        app(&state),
        get("/checkout/success?orderId=order_8&resultIndicator=forged"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_status(&state, "order_8").await, SessionStatus::Pending);
}

#[tokio::test]
async fn test_return_for_unknown_order() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, _) = send(
        app(&state),
        get("/checkout/success?orderId=nope&resultIndicator=x"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_urls_round_trip_reserved_characters() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    for order_id in ["A+B", "a&b", "ORD#7", "ord 7"] {
        let initiated = initiate(&state, order_id).await;
        let interaction = &initiated["data"]["interaction"];
        let indicator = initiated["successIndicator"].as_str().unwrap();

        let return_url = interaction["returnUrl"].as_str().unwrap();
        let uri = format!(
            "{}&resultIndicator={}",
            return_url.trim_start_matches("http://shop.test"),
            urlencoding::encode(indicator)
        );
        let (status, _) = send(app(&state), get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "order: {}", order_id);
        assert_eq!(stored_status(&state, order_id).await, SessionStatus::Success);
    }

    let initiated = initiate(&state, "C&D=1").await;
    let cancel_url = initiated["data"]["interaction"]["cancelUrl"].as_str().unwrap();
    let (status, _) = send(
        app(&state),
        get(cancel_url.trim_start_matches("http://shop.test")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_status(&state, "C&D=1").await, SessionStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_then_timeout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    initiate(&state, "order_9").await;

    let (status, _) = send(app(&state), get("/checkout?cancelled=true&orderId=order_9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_status(&state, "order_9").await, SessionStatus::Cancelled);

    let (status, _) = send(app(&state), get("/checkout?timeout=true&orderId=order_9")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(stored_status(&state, "order_9").await, SessionStatus::Cancelled);
}

#[tokio::test]
async fn test_timeout_landing() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    initiate(&state, "order_10").await;

    let (status, _) = send(app(&state), get("/checkout?timeout=true&orderId=order_10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_status(&state, "order_10").await, SessionStatus::Error);
}

#[tokio::test]
async fn test_landing_escapes_order_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, body) = send(
        app(&state),
        get("/checkout?cancelled=true&orderId=%3Cscript%3E"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let page = String::from_utf8(body).unwrap();
    assert!(!page.contains("<script>"));
    assert!(page.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn test_upload_main_image() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("public");
    let state = test_state(&uploads);

    let (status, json) = send_json(
        app(&state),
        multipart_request("uploadedFile", "../../hero.png", b"\x89PNG fake"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["filename"], "hero.png");
    assert_eq!(json["path"], "/uploads/hero.png");

    let written = std::fs::read(uploads.join("hero.png")).unwrap();
    assert_eq!(written, b"\x89PNG fake");
    assert!(!dir.path().join("hero.png").exists());
}

#[tokio::test]
async fn test_upload_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let (status, json) = send_json(
        app(&state),
        multipart_request("somethingElse", "hero.png", b"data"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");

    let (status, _) = send_json(
        app(&state),
        json_request(Method::POST, "/api/upload/main-image", "{}"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_write_failure() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the uploads directory should be
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let state = test_state(&blocker);

    let (status, json) = send_json(
        app(&state),
        multipart_request("uploadedFile", "hero.png", b"data"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to upload file");
}
