use crate::config::HttpGatewayConfig;
use crate::domain::money::PaymentRequest;
use crate::domain::order::{Capture, CaptureId, CaptureStatus, IdempotencyKey, Order, OrderId};
use crate::domain::ports::OrderGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Header the provider deduplicates order creation on.
pub const IDEMPOTENCY_HEADER: &str = "PayPal-Request-Id";

/// Client for a PayPal-style Orders v2 REST API.
pub struct HttpOrderGateway {
    client: reqwest::Client,
    config: HttpGatewayConfig,
}

impl HttpOrderGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn create_order(
        &self,
        request: &PaymentRequest,
        idempotency_key: &IdempotencyKey,
    ) -> Result<Order> {
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": request.currency().code(),
                    "value": request.amount().to_provider_string(),
                }
            }]
        });

        let resp = self
            .client
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(&self.config.access_token)
            .header(IDEMPOTENCY_HEADER, idempotency_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let created: OrderResponse = read_json(resp).await?;
        debug!(order = %created.id, status = ?created.status, "provider created order");
        created.into_order()
    }

    async fn capture_order(&self, order_id: &OrderId) -> Result<Capture> {
        let resp = self
            .client
            .post(self.url(&format!("/v2/checkout/orders/{}/capture", order_id)))
            .bearer_auth(&self.config.access_token)
            .json(&json!({}))
            .send()
            .await
            .map_err(transport_error)?;

        let captured: CaptureResponse = read_json(resp).await?;
        captured.into_capture()
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    links: Vec<Link>,
}

impl OrderResponse {
    fn into_order(self) -> Result<Order> {
        let approval_url = self
            .links
            .into_iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href)
            .ok_or_else(|| {
                PaymentError::ProviderRejected(format!("order {} has no approval link", self.id))
            })?;
        Ok(Order {
            order_id: OrderId::new(self.id),
            approval_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CaptureDetail {
    id: String,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<CaptureDetail>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Payments,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    id: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

impl CaptureResponse {
    /// Only `COMPLETED` counts as captured; pending or declined funds do not.
    fn into_capture(self) -> Result<Capture> {
        let order_id = self.id;
        let detail = self
            .purchase_units
            .into_iter()
            .flat_map(|u| u.payments.captures)
            .next()
            .ok_or_else(|| {
                PaymentError::ProviderRejected(format!(
                    "capture response for order {} has no capture",
                    order_id
                ))
            })?;
        let status = if detail.status == "COMPLETED" {
            CaptureStatus::Succeeded
        } else {
            CaptureStatus::Declined
        };
        Ok(Capture {
            capture_id: CaptureId::new(detail.id),
            status,
        })
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| {
        PaymentError::ProviderRejected(format!("malformed provider response: {}", e))
    })
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout(e.to_string())
    } else {
        PaymentError::NetworkError(e.to_string())
    }
}

/// Classifies a non-2xx response. 5xx is treated as transient transport
/// trouble; other 4xx are semantic declines.
fn status_error(status: StatusCode, body: &str) -> PaymentError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), snippet);
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        PaymentError::Timeout(message)
    } else if status.is_server_error() {
        PaymentError::NetworkError(message)
    } else {
        PaymentError::ProviderRejected(message)
    }
}
