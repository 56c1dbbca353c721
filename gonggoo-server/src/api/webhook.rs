//! Payment gateway notifications.
//!
//! The gateway redelivers on any non-2xx answer, so only errors a retry can
//! fix are answered with 500. A body that does not parse is acknowledged.

use axum::{body::Bytes, extract::State, http::StatusCode};
use gonggoo_sdk::objects::WebhookEnvelope;
use kanau::processor::Processor;

use crate::state::AppState;

/// `POST /webhooks/payments`
pub async fn payment_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed payment webhook ignored");
            return StatusCode::OK;
        }
    };

    match state.webhook_dispatcher().process(envelope).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Payment webhook handling failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
