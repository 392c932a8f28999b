//! # checkout-core
//!
//! Core types and traits for the storefront hosted checkout.
//!
//! This crate provides:
//! - `CheckoutGateway` trait for hosted checkout processors
//! - `OrderDescriptor` validation from the storefront's request
//! - `CheckoutSession` and the `SessionRepository` that tracks issued sessions
//! - `CheckoutService`, the session lifecycle (initiate, status, return)
//! - `CheckoutWidget`, the browser-side loader state machine
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{CheckoutService, InMemorySessionRepository, MerchantProfile, CallbackUrls};
//!
//! let service = CheckoutService::new(
//!     gateway,
//!     Arc::new(InMemorySessionRepository::new()),
//!     MerchantProfile::default(),
//!     CallbackUrls::new("https://shop.example"),
//! );
//!
//! let initiated = service.initiate(request).await?;
//! // Hand initiated.session_id to the widget on the page
//! ```

pub mod error;
pub mod gateway;
pub mod hosted;
pub mod merchant;
pub mod money;
pub mod order;
pub mod service;
pub mod session;
pub mod widget;

// Re-exports for convenience
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use gateway::{BoxedCheckoutGateway, CallbackUrls, CheckoutGateway};
pub use hosted::{
    CustomerInfo, HostedSession, Interaction, MerchantInfo, OrderInfo, OrderItem,
    OrderStatusInfo, ReportedStatus, SessionInfo, SessionStatusReport, SessionVersion,
    StatusSnapshot, TransactionRecord, API_VERSION, SESSION_TIMEOUT_SECS,
};
pub use merchant::{DisplayControl, MerchantAddress, MerchantProfile};
pub use money::{Currency, Price};
pub use order::{InitCheckoutRequest, OrderDescriptor, DEFAULT_DESCRIPTION};
pub use service::{CheckoutService, InitiatedCheckout};
pub use session::{CheckoutSession, InMemorySessionRepository, SessionRepository, SessionStatus};
pub use widget::{
    CallbackKind, CallbackSlots, CheckoutHost, CheckoutWidget, EventSink, Notice, NoticeLevel,
    OutcomeHandler, PaymentOutcome, PresentationMode, ScriptTag, WidgetEvent, WidgetState,
};
