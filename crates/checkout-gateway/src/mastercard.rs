//! # Mastercard Hosted Checkout
//!
//! `INITIATE_CHECKOUT` session creation and session retrieval against the
//! gateway REST API. Card data never touches this service: the customer
//! enters it on the gateway's hosted page.

use crate::config::MastercardConfig;
use async_trait::async_trait;
use checkout_core::{
    CheckoutError, CheckoutGateway, CheckoutResult, Currency, CustomerInfo, HostedSession,
    Interaction, OrderDescriptor, OrderInfo, OrderStatusInfo, ReportedStatus, SessionInfo,
    SessionStatusReport, SessionVersion, StatusSnapshot, TransactionRecord,
};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

pub const MASTERCARD_PROVIDER: &str = "mastercard";

/// Hosted checkout gateway backed by the Mastercard REST API
pub struct MastercardGateway {
    config: MastercardConfig,
    client: Client,
}

impl MastercardGateway {
    pub fn new(config: MastercardConfig) -> CheckoutResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        let config = MastercardConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &MastercardConfig {
        &self.config
    }

    fn session_url(&self) -> String {
        format!("{}/session", self.config.merchant_url())
    }

    /// `{session_url}/{id}` with the id encoded as exactly one path segment
    fn session_resource_url(&self, session_id: &str) -> CheckoutResult<Url> {
        let mut url = Url::parse(&self.session_url())
            .map_err(|e| CheckoutError::Configuration(format!("Gateway URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CheckoutError::Configuration("Gateway URL cannot be a base".to_string()))?
            .push(session_id);
        Ok(url)
    }

    /// Read the body, turning non-2xx answers into provider errors
    async fn read_body(response: Response) -> CheckoutResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        error!("Gateway API error: status={}, body={}", status, body);

        let message = serde_json::from_str::<GatewayErrorResponse>(&body)
            .ok()
            .and_then(|r| r.error.explanation.or(r.error.cause))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        Err(CheckoutError::ProviderError {
            provider: MASTERCARD_PROVIDER.to_string(),
            message,
        })
    }
}

#[async_trait]
impl CheckoutGateway for MastercardGateway {
    #[instrument(skip(self, order, interaction), fields(order_id = %order.order_id))]
    async fn initiate_checkout(
        &self,
        order: &OrderDescriptor,
        interaction: &Interaction,
    ) -> CheckoutResult<HostedSession> {
        let order_info = OrderInfo::from(order);
        let customer = CustomerInfo::from(order);

        let request = InitiateCheckoutRequest {
            api_operation: "INITIATE_CHECKOUT",
            interaction: InteractionRequest {
                operation: "PURCHASE",
                interaction,
            },
            order: OrderRequest {
                id: &order.order_id,
                amount: format_amount(order.amount(), order.currency()),
                currency: order.currency(),
                description: &order.description,
            },
            customer: &customer,
        };

        let url = self.session_url();
        debug!("Initiating hosted checkout: {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(self.config.api_username(), Some(&self.config.api_password))
            .json(&request)
            .send()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        let body = Self::read_body(response).await?;

        let created: InitiateCheckoutResponse = serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse gateway response: {}", e))
        })?;

        if created.result.as_deref().is_some_and(|r| r != "SUCCESS") {
            return Err(CheckoutError::ProviderError {
                provider: MASTERCARD_PROVIDER.to_string(),
                message: format!("Session result {}", created.result.unwrap_or_default()),
            });
        }

        info!("Created hosted checkout session: id={}", created.session.id);

        Ok(HostedSession {
            session: created.session,
            success_indicator: created.success_indicator,
            interaction: interaction.clone(),
            order: order_info,
            customer,
        })
    }

    #[instrument(skip(self))]
    async fn session_status(&self, session_id: &str) -> CheckoutResult<SessionStatusReport> {
        let url = self.session_resource_url(session_id)?;

        let response = self
            .client
            .get(url)
            .basic_auth(self.config.api_username(), Some(&self.config.api_password))
            .send()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        let body = Self::read_body(response).await?;

        let retrieved: RetrieveSessionResponse = serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse gateway response: {}", e))
        })?;

        Ok(retrieved.into_report())
    }

    fn provider_name(&self) -> &'static str {
        MASTERCARD_PROVIDER
    }
}

/// The gateway expects decimal strings with the currency's minor digits
fn format_amount(amount: f64, currency: Currency) -> String {
    format!("{:.*}", currency.decimal_places() as usize, amount)
}

// =============================================================================
// Gateway API Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiateCheckoutRequest<'a> {
    api_operation: &'static str,
    interaction: InteractionRequest<'a>,
    order: OrderRequest<'a>,
    customer: &'a CustomerInfo,
}

#[derive(Debug, Serialize)]
struct InteractionRequest<'a> {
    operation: &'static str,
    #[serde(flatten)]
    interaction: &'a Interaction,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    id: &'a str,
    amount: String,
    currency: Currency,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateCheckoutResponse {
    session: SessionInfo,
    success_indicator: String,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetrieveSessionResponse {
    session: SessionInfo,
    #[serde(default)]
    order: Option<RemoteOrder>,
    #[serde(default)]
    transaction: Vec<RemoteTransaction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteOrder {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    total_authorized_amount: Option<f64>,
    #[serde(default)]
    total_captured_amount: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteTransaction {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    result: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorResponse {
    error: GatewayError,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    cause: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

fn parse_currency(code: Option<&str>) -> Currency {
    code.and_then(|c| c.parse().ok()).unwrap_or_default()
}

impl RetrieveSessionResponse {
    fn into_report(self) -> SessionStatusReport {
        let order = self.order.unwrap_or_default();

        // A session nobody has paid on yet carries no order status
        let order_status = order.status.unwrap_or_default();
        let currency = parse_currency(order.currency.as_deref());

        let transaction = self
            .transaction
            .into_iter()
            .map(|t| TransactionRecord {
                id: t.id,
                kind: t.kind,
                frequency: t.frequency.unwrap_or_else(|| "SINGLE".to_string()),
                amount: t.amount,
                currency: t.currency.as_deref().map_or(currency, |c| parse_currency(Some(c))),
                result: t.result,
            })
            .collect();

        SessionStatusReport {
            status: ReportedStatus::from_order_status(&order_status),
            data: StatusSnapshot {
                session: SessionVersion {
                    id: self.session.id,
                    version: self.session.version,
                },
                order: OrderStatusInfo {
                    status: order_status,
                    total_authorized_amount: order
                        .total_authorized_amount
                        .or(order.amount)
                        .unwrap_or(0.0),
                    total_captured_amount: order.total_captured_amount.unwrap_or(0.0),
                    currency,
                },
                transaction,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{CallbackUrls, MerchantProfile, Price};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SESSION_PATH: &str = "/api/rest/version/67/merchant/TESTSHOP01/session";

    fn gateway(server: &MockServer) -> MastercardGateway {
        let config = MastercardConfig::new("TESTSHOP01", "secret").with_gateway_url(server.uri());
        MastercardGateway::new(config).unwrap()
    }

    fn order() -> OrderDescriptor {
        OrderDescriptor {
            order_id: "order_42".to_string(),
            price: Price::new(59.9, Currency::USD),
            customer_email: Some("ada@example.com".to_string()),
            customer_name: Some("Ada Lovelace".to_string()),
            description: "Online Purchase".to_string(),
        }
    }

    fn interaction(order: &OrderDescriptor) -> Interaction {
        Interaction::new(
            &MerchantProfile::default(),
            &CallbackUrls::new("https://shop.example"),
            &order.order_id,
        )
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(59.9, Currency::USD), "59.90");
        assert_eq!(format_amount(1500.0, Currency::JPY), "1500");
    }

    #[tokio::test]
    async fn test_initiate_checkout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "apiOperation": "INITIATE_CHECKOUT",
                "interaction": {
                    "operation": "PURCHASE",
                    "timeout": 1800,
                    "returnUrl": "https://shop.example/checkout/success?orderId=order_42"
                },
                "order": {"id": "order_42", "amount": "59.90", "currency": "USD"},
                "customer": {"firstName": "Ada", "lastName": "Lovelace"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "merchant": "TESTSHOP01",
                "result": "SUCCESS",
                "session": {"id": "SESSION0002", "updateStatus": "SUCCESS", "version": "ab12"},
                "successIndicator": "f1e2d3c4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = order();
        let interaction = interaction(&order);
        let hosted = gateway(&server)
            .initiate_checkout(&order, &interaction)
            .await
            .unwrap();

        assert_eq!(hosted.session_id(), "SESSION0002");
        assert_eq!(hosted.success_indicator, "f1e2d3c4");
        assert_eq!(hosted.interaction, interaction);
        assert_eq!(hosted.order.id, "order_42");
    }

    #[tokio::test]
    async fn test_provider_error_carries_explanation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "result": "ERROR",
                "error": {"cause": "INVALID_REQUEST", "explanation": "Invalid currency"}
            })))
            .mount(&server)
            .await;

        let order = order();
        let err = gateway(&server)
            .initiate_checkout(&order, &interaction(&order))
            .await
            .unwrap_err();

        match err {
            CheckoutError::ProviderError { provider, message } => {
                assert_eq!(provider, "mastercard");
                assert_eq!(message, "Invalid currency");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let order = order();
        let err = gateway(&server)
            .initiate_checkout(&order, &interaction(&order))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_network_error() {
        let config = MastercardConfig::new("TESTSHOP01", "secret")
            .with_gateway_url("http://127.0.0.1:1");
        let order = order();

        let err = MastercardGateway::new(config)
            .unwrap()
            .initiate_checkout(&order, &interaction(&order))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_session_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/SESSION0002", SESSION_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session": {"id": "SESSION0002", "updateStatus": "SUCCESS", "version": "ab12"},
                "order": {
                    "id": "order_42",
                    "status": "CAPTURED",
                    "amount": 59.9,
                    "totalAuthorizedAmount": 59.9,
                    "totalCapturedAmount": 59.9,
                    "currency": "USD"
                },
                "transaction": [{
                    "id": "1",
                    "type": "PAYMENT",
                    "amount": 59.9,
                    "currency": "USD",
                    "result": "SUCCESS"
                }]
            })))
            .mount(&server)
            .await;

        let report = gateway(&server).session_status("SESSION0002").await.unwrap();

        assert_eq!(report.status, ReportedStatus::Completed);
        assert_eq!(report.data.session.version, "ab12");
        assert_eq!(report.data.order.total_captured_amount, 59.9);
        assert_eq!(report.data.transaction[0].frequency, "SINGLE");
    }

    #[tokio::test]
    async fn test_session_id_stays_inside_session_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/rest/version/67/merchant/TESTSHOP01/order/victim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session": {"id": "victim", "version": "1"}
            })))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let url = gateway.session_resource_url("../order/victim").unwrap();
        assert!(url.path().starts_with(SESSION_PATH));
        assert!(url.path().ends_with("%2Forder%2Fvictim"));

        let err = gateway.session_status("../order/victim").await.unwrap_err();
        assert!(matches!(err, CheckoutError::ProviderError { .. }));
    }

    #[tokio::test]
    async fn test_unpaid_session_is_pending() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/SESSION0003", SESSION_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session": {"id": "SESSION0003", "version": "1"}
            })))
            .mount(&server)
            .await;

        let report = gateway(&server).session_status("SESSION0003").await.unwrap();

        assert_eq!(report.status, ReportedStatus::Pending);
        assert!(report.data.transaction.is_empty());
        assert_eq!(report.data.order.currency, Currency::USD);
    }
}
