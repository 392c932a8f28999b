//! # Request Handlers
//!
//! Axum request handlers for the checkout API.
//! Session initiation and status reads are JSON; the landing pages the
//! payment processor redirects back to are HTML.

use crate::state::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use checkout_core::{
    CheckoutError, InitCheckoutRequest, InitiatedCheckout, ReportedStatus, StatusSnapshot,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "uploadedFile";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Initiation response: `{success, sessionId, successIndicator, data}`
#[derive(Debug, Serialize)]
pub struct InitCheckoutResponse {
    pub success: bool,
    #[serde(flatten)]
    pub checkout: InitiatedCheckout,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Status response: `{success, status, data}`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: ReportedStatus,
    pub data: StatusSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnQuery {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub result_indicator: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingQuery {
    #[serde(default)]
    pub cancelled: Option<bool>,
    #[serde(default)]
    pub timeout: Option<bool>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub path: String,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Server-side failures get a fixed `error` plus a redacted `details`;
/// everything else reports its own message.
fn checkout_error_to_response(err: CheckoutError, context: &str) -> ApiError {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let response = if status.is_server_error() {
        error!("{}: {}", context, err);
        ErrorResponse::new(context, code).with_details(err.public_message())
    } else {
        ErrorResponse::new(err.public_message(), code)
    };

    (status, Json(response))
}

fn bad_request(message: impl Into<String>, details: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400).with_details(details)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront-checkout",
        "version": env!("CARGO_PKG_VERSION"),
        "gateway": state.checkout.provider_name()
    }))
}

/// Open a hosted checkout session for an order
#[instrument(skip(state, body))]
pub async fn init_checkout(
    State(state): State<AppState>,
    body: Result<Json<InitCheckoutRequest>, JsonRejection>,
) -> Result<Json<InitCheckoutResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!("Rejected checkout body: {}", rejection.body_text());
        bad_request("Invalid request body", rejection.body_text())
    })?;

    let checkout = state
        .checkout
        .initiate(request)
        .await
        .map_err(|e| checkout_error_to_response(e, "Failed to initialize checkout session"))?;

    Ok(Json(InitCheckoutResponse {
        success: true,
        checkout,
    }))
}

/// Read the status of a hosted session
#[instrument(skip(state))]
pub async fn checkout_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let report = state
        .checkout
        .status(query.session_id.as_deref())
        .await
        .map_err(|e| checkout_error_to_response(e, "Failed to read session status"))?;

    Ok(Json(StatusResponse {
        success: true,
        status: report.status,
        data: report.data,
    }))
}

/// Return redirect from the payment page
#[instrument(skip(state, query), fields(order_id = ?query.order_id))]
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let session = state
        .checkout
        .confirm_return(query.order_id.as_deref(), query.result_indicator.as_deref())
        .await
        .map_err(landing_error)?;

    Ok(Html(render_page(
        "Payment Successful",
        "✅",
        "Payment Successful!",
        &format!(
            "Order <code>{}</code> has been paid.",
            escape_html(&session.order_id)
        ),
    )))
}

/// Cancel and timeout redirects from the payment page
#[instrument(skip(state, query), fields(order_id = ?query.order_id))]
pub async fn checkout_landing(
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let order_id = query.order_id.as_deref();

    if query.cancelled.unwrap_or(false) {
        let session = state.checkout.cancel(order_id).await.map_err(landing_error)?;
        return Ok(Html(render_page(
            "Payment Cancelled",
            "❌",
            "Payment Cancelled",
            &format!(
                "Order <code>{}</code> was not charged.",
                escape_html(&session.order_id)
            ),
        )));
    }

    if query.timeout.unwrap_or(false) {
        let session = state.checkout.time_out(order_id).await.map_err(landing_error)?;
        return Ok(Html(render_page(
            "Payment Timed Out",
            "⏱️",
            "Payment Timed Out",
            &format!(
                "The payment page for order <code>{}</code> expired. Please start checkout again.",
                escape_html(&session.order_id)
            ),
        )));
    }

    Ok(Html(render_page(
        "Checkout",
        "🛒",
        "Checkout",
        "Return to the store to start a new checkout.",
    )))
}

/// Store an uploaded main image
#[instrument(skip(state, multipart))]
pub async fn upload_main_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| bad_request("No file uploaded", rejection.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("Malformed multipart body", e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().and_then(sanitize_filename);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request("Malformed multipart body", e.body_text()))?;

        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = match upload {
        Some((Some(filename), bytes)) => (filename, bytes),
        Some((None, _)) => {
            return Err(bad_request("No file uploaded", "File name is missing or invalid"))
        }
        None => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("No file uploaded", 400)),
            ))
        }
    };

    let dir = state.uploads_dir().to_path_buf();
    let target = dir.join(&filename);

    let written: std::io::Result<()> = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&target, &bytes).await
    }
    .await;

    if let Err(e) = written {
        error!("Upload to {} failed: {}", target.display(), e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to upload file", 500).with_details(e.to_string())),
        ));
    }

    info!("Uploaded {} ({} bytes)", filename, bytes.len());

    Ok(Json(UploadResponse {
        success: true,
        path: format!("/uploads/{}", filename),
        filename,
        message: "File uploaded successfully".to_string(),
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn landing_error(err: CheckoutError) -> (StatusCode, Html<String>) {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warn!("Checkout landing rejected: {}", err);

    (
        status,
        Html(render_page(
            "Checkout Error",
            "⚠️",
            "Something went wrong",
            &escape_html(&err.public_message()),
        )),
    )
}

/// Keep only the final path component of a client-supplied file name
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_page(title: &str, icon: &str, heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title}</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">{icon}</div>
        <h1>{heading}</h1>
        <p style="color: #666;">{body}</p>
    </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_validation_error_conversion() {
        let (status, Json(body)) = checkout_error_to_response(
            CheckoutError::validation("Invalid amount"),
            "Failed to initialize checkout session",
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid amount");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_unexpected_error_is_redacted() {
        let (status, Json(body)) = checkout_error_to_response(
            CheckoutError::Configuration("MPGS_API_PASSWORD=hunter2".into()),
            "Failed to initialize checkout session",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to initialize checkout session");
        assert_eq!(body.details.as_deref(), Some("Internal server error"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.png").as_deref(), Some("photo.png"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\cat.jpg").as_deref(),
            Some("cat.jpg")
        );
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("dir/"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }
}
