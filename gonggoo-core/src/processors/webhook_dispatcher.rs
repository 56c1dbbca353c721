//! Routes gateway notifications.
//!
//! Only a `PAYMENT_STATUS_CHANGED` event can fail the delivery (so the
//! gateway redelivers it). The dedicated failure events log and swallow
//! every error: the cleanup they trigger is idempotent and the sweeper picks
//! up anything left behind.

use gonggoo_sdk::objects::{PaymentEventData, PaymentStatus, WebhookEnvelope, WebhookEventType};
use kanau::processor::Processor;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn};

use super::failure_cleanup::{CleanupOrder, CleanupTrigger, FailureCleanupProcessor, OrderLocator};
use crate::entities::payments::{MirrorPaymentStatus, StatusDetail};
use crate::framework::DatabaseProcessor;

const DEFAULT_FAIL_REASON: &str = "unknown error";
const DEFAULT_CANCEL_REASON: &str = "user cancelled";

#[derive(Debug, Error)]
pub enum WebhookDispatchError {
    #[error("status change event without payment key")]
    MissingPaymentKey,

    #[error("status change event without status")]
    MissingStatus,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// Event type this service does not act on.
    Ignored,
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    db: DatabaseProcessor,
    cleanup: FailureCleanupProcessor,
}

impl WebhookDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor::new(pool.clone()),
            cleanup: FailureCleanupProcessor::new(pool),
        }
    }

    async fn release_order(&self, data: &PaymentEventData, status: &PaymentStatus) {
        let Some(locator) = locate_order(data) else {
            warn!(status = %status, "Failure event names neither order nor payment");
            return;
        };
        let outcome = self
            .cleanup
            .run_isolated(CleanupOrder {
                locator,
                trigger: CleanupTrigger::Webhook {
                    payment_key: data.payment_key.clone(),
                    payment_status: status.clone(),
                },
            })
            .await;
        debug!(outcome = ?outcome, "Webhook cleanup finished");
    }

    async fn on_status_changed(
        &self,
        data: PaymentEventData,
    ) -> Result<DispatchOutcome, WebhookDispatchError> {
        let payment_key = data
            .payment_key
            .clone()
            .ok_or(WebhookDispatchError::MissingPaymentKey)?;
        let status = data.status.clone().ok_or(WebhookDispatchError::MissingStatus)?;

        if status.is_failure() {
            self.release_order(&data, &status).await;
        }

        self.db
            .process(MirrorPaymentStatus {
                payment_key,
                order_id: data.order_id.clone(),
                status: status.as_str().to_string(),
                webhook_data: data.to_value(),
                detail: StatusDetail::None,
            })
            .await?;
        info!(status = %status, "Payment status mirrored");
        Ok(DispatchOutcome::Handled)
    }

    async fn on_terminal_event(&self, data: PaymentEventData, status: PaymentStatus) {
        self.release_order(&data, &status).await;

        let Some(payment_key) = data.payment_key.clone() else {
            warn!(status = %status, "Failure event without payment key, status not recorded");
            return;
        };
        let detail = terminal_detail(&data, &status, OffsetDateTime::now_utc());
        let result = self
            .db
            .process(MirrorPaymentStatus {
                payment_key,
                order_id: data.order_id.clone(),
                status: status.as_str().to_string(),
                webhook_data: data.to_value(),
                detail,
            })
            .await;
        if let Err(e) = result {
            error!(status = %status, error = %e, "Failed to record payment failure");
        }
    }
}

impl Processor<WebhookEnvelope> for WebhookDispatcher {
    type Output = DispatchOutcome;
    type Error = WebhookDispatchError;
    #[tracing::instrument(
        skip_all,
        err,
        name = "DispatchWebhook",
        fields(event_type = %envelope.event_type, payment_key = ?envelope.data.payment_key)
    )]
    async fn process(
        &self,
        envelope: WebhookEnvelope,
    ) -> Result<DispatchOutcome, WebhookDispatchError> {
        let status = match &envelope.event_type {
            WebhookEventType::PaymentStatusChanged => {
                return self.on_status_changed(envelope.data).await;
            }
            WebhookEventType::PaymentFailed => PaymentStatus::Failed,
            WebhookEventType::PaymentCanceled => PaymentStatus::Canceled,
            WebhookEventType::PaymentExpired => PaymentStatus::Expired,
            WebhookEventType::Other(event_type) => {
                warn!(event_type = %event_type, "Unhandled webhook event type");
                return Ok(DispatchOutcome::Ignored);
            }
        };
        self.on_terminal_event(envelope.data, status).await;
        Ok(DispatchOutcome::Handled)
    }
}

/// Prefer the order id; fall back to the payment key.
fn locate_order(data: &PaymentEventData) -> Option<OrderLocator> {
    data.order_id
        .clone()
        .map(OrderLocator::OrderId)
        .or_else(|| data.payment_key.clone().map(OrderLocator::PaymentKey))
}

fn terminal_detail(
    data: &PaymentEventData,
    status: &PaymentStatus,
    now: OffsetDateTime,
) -> StatusDetail {
    match status {
        PaymentStatus::Failed => StatusDetail::FailReason(
            data.fail_reason
                .clone()
                .unwrap_or_else(|| DEFAULT_FAIL_REASON.to_string()),
        ),
        PaymentStatus::Canceled => StatusDetail::CancelReason(
            data.cancel_reason
                .clone()
                .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string()),
        ),
        PaymentStatus::Expired => StatusDetail::ExpiredAt(parse_expired_at(
            data.expired_at.as_deref(),
            now,
        )),
        _ => StatusDetail::None,
    }
}

/// Expiry reported by the gateway, or `now` when absent or unparsable.
fn parse_expired_at(raw: Option<&str>, now: OffsetDateTime) -> OffsetDateTime {
    match raw {
        Some(raw) => OffsetDateTime::parse(raw, &Rfc3339).unwrap_or_else(|e| {
            warn!(expired_at = raw, error = %e, "Unparsable expiry time, using now");
            now
        }),
        None => now,
    }
}
