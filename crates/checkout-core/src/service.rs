//! # Checkout Service
//!
//! The session lifecycle: initiation, status reads and the landing
//! redirects (return, cancel, timeout) that close a session.

use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::{BoxedCheckoutGateway, CallbackUrls};
use crate::hosted::{HostedSession, Interaction, SessionStatusReport};
use crate::merchant::MerchantProfile;
use crate::order::{InitCheckoutRequest, OrderDescriptor};
use crate::session::{CheckoutSession, SessionRepository, SessionStatus};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Expired sessions are kept this long so late status reads can say "expired"
const EXPIRED_RETENTION_SECS: i64 = 3600;

/// Longest session id accepted on a status read
const MAX_SESSION_ID_LEN: usize = 128;

/// Successful initiation result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedCheckout {
    pub session_id: String,
    pub success_indicator: String,
    pub data: HostedSession,
}

/// Drives checkout sessions against a gateway and a session repository.
#[derive(Clone)]
pub struct CheckoutService {
    gateway: BoxedCheckoutGateway,
    sessions: Arc<dyn SessionRepository>,
    merchant: MerchantProfile,
    urls: CallbackUrls,
}

impl CheckoutService {
    pub fn new(
        gateway: BoxedCheckoutGateway,
        sessions: Arc<dyn SessionRepository>,
        merchant: MerchantProfile,
        urls: CallbackUrls,
    ) -> Self {
        Self {
            gateway,
            sessions,
            merchant,
            urls,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.gateway.provider_name()
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    /// Validate the request, open a hosted session and record it.
    ///
    /// Nothing reaches the gateway or the repository unless validation passes.
    #[instrument(skip(self, request))]
    pub async fn initiate(&self, request: InitCheckoutRequest) -> CheckoutResult<InitiatedCheckout> {
        let order = OrderDescriptor::try_from(request)?;
        let interaction = Interaction::new(&self.merchant, &self.urls, &order.order_id);

        info!(
            "Initializing checkout: order={}, total={}, provider={}",
            order.order_id,
            order.price.display(),
            self.gateway.provider_name()
        );

        let hosted = self.gateway.initiate_checkout(&order, &interaction).await?;

        let cutoff = Utc::now() - Duration::seconds(EXPIRED_RETENTION_SECS);
        let purged = self.sessions.purge_expired_before(cutoff).await?;
        if purged > 0 {
            info!("Purged {} expired checkout sessions", purged);
        }

        self.sessions
            .insert(CheckoutSession::new(
                hosted.session_id(),
                &order.order_id,
                &hosted.success_indicator,
                interaction.timeout,
            ))
            .await?;

        info!("Checkout session created: {}", hosted.session_id());

        Ok(InitiatedCheckout {
            session_id: hosted.session.id.clone(),
            success_indicator: hosted.success_indicator.clone(),
            data: hosted,
        })
    }

    /// Status snapshot for a session id.
    ///
    /// Sessions this service issued and that timed out while still pending
    /// are reported as expired; everything else is answered by the gateway.
    #[instrument(skip(self))]
    pub async fn status(&self, session_id: Option<&str>) -> CheckoutResult<SessionStatusReport> {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CheckoutError::validation("Session ID is required"))?;

        // The id ends up in the processor's REST path
        if !is_well_formed_session_id(session_id) {
            warn!("Rejected malformed session id on status read");
            return Err(CheckoutError::validation("Invalid session ID"));
        }

        if let Some(session) = self.sessions.get(session_id).await? {
            if session.status == SessionStatus::Pending && session.is_expired() {
                return Err(CheckoutError::SessionExpired {
                    session_id: session_id.to_string(),
                });
            }
        }

        self.gateway.session_status(session_id).await
    }

    /// Handle the processor's return redirect.
    ///
    /// The `result_indicator` must equal the success indicator issued with
    /// the order's session, otherwise the redirect is treated as forged.
    /// Repeating a confirmed return is harmless.
    #[instrument(skip(self, result_indicator))]
    pub async fn confirm_return(
        &self,
        order_id: Option<&str>,
        result_indicator: Option<&str>,
    ) -> CheckoutResult<CheckoutSession> {
        let order_id = required(order_id, "Order ID is required")?;
        let indicator = required(result_indicator, "Result indicator is required")?;

        let session = self.session_for_order(order_id).await?;

        if !session.indicator_matches(indicator) {
            warn!("Result indicator mismatch for order {}", order_id);
            return Err(CheckoutError::IndicatorMismatch {
                order_id: order_id.to_string(),
            });
        }

        if session.status == SessionStatus::Success {
            return Ok(session);
        }

        let session = self
            .sessions
            .update_status(&session.session_id, SessionStatus::Success)
            .await?;
        info!("Payment confirmed: order={}, session={}", order_id, session.session_id);
        Ok(session)
    }

    /// Customer cancelled on the payment page.
    pub async fn cancel(&self, order_id: Option<&str>) -> CheckoutResult<CheckoutSession> {
        self.close(order_id, SessionStatus::Cancelled).await
    }

    /// Payment page timed out.
    pub async fn time_out(&self, order_id: Option<&str>) -> CheckoutResult<CheckoutSession> {
        self.close(order_id, SessionStatus::Error).await
    }

    async fn close(
        &self,
        order_id: Option<&str>,
        status: SessionStatus,
    ) -> CheckoutResult<CheckoutSession> {
        let order_id = required(order_id, "Order ID is required")?;
        let session = self.session_for_order(order_id).await?;
        let session = self
            .sessions
            .update_status(&session.session_id, status)
            .await?;
        info!("Checkout {}: order={}", status, order_id);
        Ok(session)
    }

    async fn session_for_order(&self, order_id: &str) -> CheckoutResult<CheckoutSession> {
        self.sessions
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NoSessionForOrder {
                order_id: order_id.to_string(),
            })
    }
}

/// Letters, digits, `_` and `-` only
fn is_well_formed_session_id(id: &str) -> bool {
    id.len() <= MAX_SESSION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn required<'a>(value: Option<&'a str>, message: &str) -> CheckoutResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CheckoutError::validation(message))
}
