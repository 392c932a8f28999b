//! # Mock Gateway
//!
//! Stands in for the processor in demos and tests. Sessions look real
//! but nothing is opened upstream, and every status read reports a
//! captured 100.00 USD payment.

use async_trait::async_trait;
use checkout_core::{
    CheckoutResult, CheckoutGateway, Currency, CustomerInfo, HostedSession, Interaction,
    OrderDescriptor, OrderInfo, OrderStatusInfo, ReportedStatus, SessionInfo,
    SessionStatusReport, SessionVersion, StatusSnapshot, TransactionRecord, API_VERSION,
};
use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Provider name the mock registers under
pub const MOCK_PROVIDER: &str = "mock";

#[derive(Debug, Clone, Copy, Default)]
pub struct MockGateway;

impl MockGateway {
    pub fn new() -> Self {
        Self
    }

    /// `session_<millis>_<13 random chars>`
    fn session_id(millis: i64) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!("session_{}_{}", millis, &random[..13])
    }
}

#[async_trait]
impl CheckoutGateway for MockGateway {
    #[instrument(skip(self, order, interaction), fields(order_id = %order.order_id))]
    async fn initiate_checkout(
        &self,
        order: &OrderDescriptor,
        interaction: &Interaction,
    ) -> CheckoutResult<HostedSession> {
        let millis = Utc::now().timestamp_millis();
        let session_id = Self::session_id(millis);

        debug!("Mock checkout session: {}", session_id);

        Ok(HostedSession {
            session: SessionInfo {
                id: session_id,
                update_status: "SUCCESS".to_string(),
                version: API_VERSION.to_string(),
            },
            success_indicator: format!("{}_success_{}", order.order_id, millis),
            interaction: interaction.clone(),
            order: OrderInfo::from(order),
            customer: CustomerInfo::from(order),
        })
    }

    async fn session_status(&self, session_id: &str) -> CheckoutResult<SessionStatusReport> {
        Ok(SessionStatusReport {
            status: ReportedStatus::Completed,
            data: StatusSnapshot {
                session: SessionVersion {
                    id: session_id.to_string(),
                    version: API_VERSION.to_string(),
                },
                order: OrderStatusInfo {
                    status: "CAPTURED".to_string(),
                    total_authorized_amount: 100.0,
                    total_captured_amount: 100.0,
                    currency: Currency::USD,
                },
                transaction: vec![TransactionRecord {
                    id: format!("txn_{}", Utc::now().timestamp_millis()),
                    kind: "PAYMENT".to_string(),
                    frequency: "SINGLE".to_string(),
                    amount: 100.0,
                    currency: Currency::USD,
                    result: "SUCCESS".to_string(),
                }],
            },
        })
    }

    fn provider_name(&self) -> &'static str {
        MOCK_PROVIDER
    }
}
