//! Callable API client (mobile shell → payments backend).

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::ClientError;
use crate::objects::{
    CancelPaymentRequest, CancelPaymentResponse, ConfirmPaymentRequest, ConfirmPaymentResponse,
    DeletePendingOrderRequest, DeletePendingOrderResponse, ErrorBody, GetUserRefundsRequest,
    GetUserRefundsResponse, RefundPaymentRequest, RefundPaymentResponse,
};
use crate::signature::{AUTHORIZATION_HEADER, BEARER_PREFIX};

/// Typed HTTP client for the callable API.
///
/// Every call is a `POST /api/v1/callable/{name}` with a JSON body and the
/// caller's session token.
#[derive(Debug, Clone)]
pub struct CallableClient {
    http: Client,
    base_url: Url,
    session_token: String,
}

impl CallableClient {
    /// * `base_url` – root URL of the backend (e.g. `https://api.example.com`).
    /// * `session_token` – token minted by the auth service for the user.
    pub fn new(base_url: Url, session_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session_token: session_token.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub async fn confirm_payment(
        &self,
        req: &ConfirmPaymentRequest,
    ) -> Result<ConfirmPaymentResponse, ClientError> {
        self.call("confirmPayment", req).await
    }

    pub async fn cancel_payment(
        &self,
        req: &CancelPaymentRequest,
    ) -> Result<CancelPaymentResponse, ClientError> {
        self.call("cancelPayment", req).await
    }

    pub async fn refund_payment(
        &self,
        req: &RefundPaymentRequest,
    ) -> Result<RefundPaymentResponse, ClientError> {
        self.call("refundPayment", req).await
    }

    pub async fn get_user_refunds(
        &self,
        req: &GetUserRefundsRequest,
    ) -> Result<GetUserRefundsResponse, ClientError> {
        self.call("getUserRefunds", req).await
    }

    pub async fn delete_pending_order_on_payment_failure(
        &self,
        req: &DeletePendingOrderRequest,
    ) -> Result<DeletePendingOrderResponse, ClientError> {
        self.call("deletePendingOrderOnPaymentFailure", req).await
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        name: &str,
        req: &Req,
    ) -> Result<Resp, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/callable/{name}"))?;
        let resp = self
            .http
            .post(url)
            .header(
                AUTHORIZATION_HEADER,
                format!("{BEARER_PREFIX}{}", self.session_token),
            )
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => Err(ClientError::Api { status, body }),
            Err(_) => Err(ClientError::Unexpected {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        };
    }
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
