//! Client for the payment gateway's confirm and cancel endpoints.
//!
//! The gateway authenticates with HTTP basic auth: the secret key is the
//! username and the password is empty.

use std::time::Duration;

use gonggoo_sdk::objects::{PaymentStatus, RefundReceiveAccount};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::GatewayConfig;

const CONFIRM_PATH: &str = "/v1/payments/confirm";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status.
    #[error("gateway rejected request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
        body: serde_json::Value,
    },

    #[error("gateway request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway response parsing error: {0}")]
    Decode(String),

    #[error("invalid gateway url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub cancel_reason: String,
    /// Omitted for a full cancellation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_free_amount: Option<i64>,
    /// Required by the gateway for virtual-account refunds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_receive_account: Option<RefundReceiveAccount>,
}

/// Payment object returned by the gateway, with the fields we act on pulled out.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub status: PaymentStatus,
    pub total_amount: Option<i64>,
    pub raw: serde_json::Value,
}

impl GatewayPayment {
    pub fn from_value(raw: serde_json::Value) -> Result<Self, GatewayError> {
        let object = raw
            .as_object()
            .ok_or_else(|| GatewayError::Decode("payment is not a JSON object".to_string()))?;
        let status = object
            .get("status")
            .and_then(|s| s.as_str())
            .map(|s| PaymentStatus::from(s.to_string()))
            .ok_or_else(|| GatewayError::Decode("payment has no status".to_string()))?;
        let total_amount = object.get("totalAmount").and_then(|a| a.as_i64());
        Ok(Self {
            status,
            total_amount,
            raw,
        })
    }
}

#[derive(Clone)]
pub struct TossGateway {
    http_client: reqwest::Client,
    base_url: Url,
    secret_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for TossGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TossGateway")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl TossGateway {
    /// Built per request from the current config, so a reload applies to the
    /// next call. The `reqwest::Client` and its connection pool are shared.
    pub fn new(http_client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
            timeout: config.timeout,
        }
    }

    fn confirm_url(&self) -> Result<Url, GatewayError> {
        Ok(self.base_url.join(CONFIRM_PATH)?)
    }

    fn cancel_url(&self, payment_key: &str) -> Result<Url, GatewayError> {
        let path = format!(
            "/v1/payments/{}/cancel",
            urlencoding::encode(payment_key)
        );
        Ok(self.base_url.join(&path)?)
    }

    #[tracing::instrument(skip_all, err, fields(order_id = %request.order_id))]
    pub async fn confirm(&self, request: &ConfirmRequest) -> Result<GatewayPayment, GatewayError> {
        let response = self
            .http_client
            .post(self.confirm_url()?)
            .basic_auth(&self.secret_key, None::<&str>)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        read_payment(response).await
    }

    /// Cancel all or part of a payment. The same idempotency key always
    /// yields the same gateway result.
    #[tracing::instrument(skip_all, err)]
    pub async fn cancel(
        &self,
        payment_key: &str,
        request: &CancelRequest,
        idempotency_key: Option<&str>,
    ) -> Result<GatewayPayment, GatewayError> {
        let mut builder = self
            .http_client
            .post(self.cancel_url(payment_key)?)
            .basic_auth(&self.secret_key, None::<&str>)
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        let response = builder.send().await?;
        read_payment(response).await
    }
}

async fn read_payment(response: reqwest::Response) -> Result<GatewayPayment, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(rejection(status, &bytes));
    }
    let raw: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))?;
    GatewayPayment::from_value(raw)
}

/// Build a rejection from the gateway's `{code, message}` error body.
fn rejection(status: StatusCode, bytes: &[u8]) -> GatewayError {
    let body = serde_json::from_slice::<serde_json::Value>(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()));
    let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(str::to_string);
    let code = field("code").unwrap_or_else(|| "UNKNOWN_ERROR".to_string());
    let message = field("message").unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("gateway error")
            .to_string()
    });
    GatewayError::Rejected {
        status: status.as_u16(),
        code,
        message,
        body,
    }
}
