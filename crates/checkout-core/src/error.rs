//! # Checkout Error Types
//!
//! Typed error handling for the storefront checkout flow.
//! All checkout operations return `Result<T, CheckoutError>`.

use thiserror::Error;

/// Broad category of a failure, used to decide how it is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client-caused: bad input or a session in the wrong state (HTTP 4xx)
    Validation,
    /// Processor or payment script failure, reported as a transient notice
    Integration,
    /// Anything else, reported as HTTP 500 with a redacted message
    Unexpected,
}

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing credentials, unreadable files)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or invalid request field
    #[error("{0}")]
    Validation(String),

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Processor answered with an error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the processor
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The hosted checkout script could not be loaded or driven
    #[error("Payment script error: {0}")]
    Script(String),

    /// Session unknown to the repository
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Session known but past its timeout
    #[error("Session expired: {session_id}")]
    SessionExpired { session_id: String },

    /// No session was issued for the order
    #[error("No checkout session for order {order_id}")]
    NoSessionForOrder { order_id: String },

    /// A session id was issued twice
    #[error("Session {session_id} already issued")]
    SessionConflict { session_id: String },

    /// Session already reached a terminal status
    #[error("Session {session_id} is already {status}")]
    SessionClosed { session_id: String, status: String },

    /// Result indicator on a return redirect did not match the issued one
    #[error("Result indicator does not match session for order {order_id}")]
    IndicatorMismatch { order_id: String },

    /// Widget event that is not valid in its current state
    #[error("Invalid widget transition: {0}")]
    InvalidTransition(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckoutError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::Validation(message.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Validation(_)
            | CheckoutError::UnsupportedCurrency { .. }
            | CheckoutError::IndicatorMismatch { .. }
            | CheckoutError::NoSessionForOrder { .. }
            | CheckoutError::SessionNotFound { .. }
            | CheckoutError::SessionExpired { .. }
            | CheckoutError::SessionConflict { .. }
            | CheckoutError::SessionClosed { .. }
            | CheckoutError::InvalidTransition(_) => ErrorKind::Validation,
            CheckoutError::ProviderError { .. }
            | CheckoutError::NetworkError(_)
            | CheckoutError::Script(_) => ErrorKind::Integration,
            CheckoutError::Configuration(_)
            | CheckoutError::Io(_)
            | CheckoutError::Internal(_)
            | CheckoutError::Serialization(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::Validation(_) => 400,
            CheckoutError::UnsupportedCurrency { .. } => 400,
            CheckoutError::ProviderError { .. } => 502,
            CheckoutError::NetworkError(_) => 503,
            CheckoutError::Script(_) => 502,
            CheckoutError::SessionNotFound { .. } => 404,
            CheckoutError::SessionExpired { .. } => 410,
            CheckoutError::NoSessionForOrder { .. } => 404,
            CheckoutError::SessionConflict { .. } => 409,
            CheckoutError::SessionClosed { .. } => 409,
            CheckoutError::IndicatorMismatch { .. } => 400,
            CheckoutError::InvalidTransition(_) => 400,
            CheckoutError::Io(_) => 500,
            CheckoutError::Internal(_) => 500,
            CheckoutError::Serialization(_) => 500,
        }
    }

    /// Message safe to show to a client.
    ///
    /// Unexpected errors that carry internal detail (I/O paths, config
    /// values) are reduced to a generic sentence.
    pub fn public_message(&self) -> String {
        match self {
            CheckoutError::Configuration(_)
            | CheckoutError::Io(_)
            | CheckoutError::Internal(_)
            | CheckoutError::Serialization(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CheckoutError::validation("Invalid amount").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CheckoutError::Script("load failed".into()).kind(),
            ErrorKind::Integration
        );
        assert_eq!(
            CheckoutError::Internal("boom".into()).kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_session_errors_are_client_errors() {
        let id = || "s".to_string();
        for err in [
            CheckoutError::SessionNotFound { session_id: id() },
            CheckoutError::SessionExpired { session_id: id() },
            CheckoutError::SessionConflict { session_id: id() },
            CheckoutError::SessionClosed {
                session_id: id(),
                status: "cancelled".into(),
            },
        ] {
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
            assert!((400..500).contains(&err.status_code()));
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckoutError::validation("x").status_code(), 400);
        assert_eq!(
            CheckoutError::SessionExpired {
                session_id: "s".into()
            }
            .status_code(),
            410
        );
        assert_eq!(
            CheckoutError::ProviderError {
                provider: "mastercard".into(),
                message: "declined".into()
            }
            .status_code(),
            502
        );
    }

    #[test]
    fn test_validation_message_is_bare() {
        assert_eq!(
            CheckoutError::validation("Order ID is required").to_string(),
            "Order ID is required"
        );
    }

    #[test]
    fn test_public_message_redacts_internal_detail() {
        let err = CheckoutError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/var/www/public: permission denied",
        ));
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(
            CheckoutError::validation("Invalid amount").public_message(),
            "Invalid amount"
        );
    }
}
