use kanau::processor::Processor;
use time::OffsetDateTime;
use tracing::error;

use super::PaymentProcessor;
use super::refund_ledger::{RecordRefund, RefundLedgerOutcome};
use crate::entities::orders::GetOrderById;
use crate::error::ServiceError;
use crate::gateway::CancelRequest;
use crate::reconcile::{self, CancelRejection};

/// Cancel a paid order on the caller's behalf.
#[derive(Debug, Clone)]
pub struct CancelPayment {
    pub user_id: String,
    pub payment_key: String,
    pub order_id: String,
    pub cancel_reason: String,
    pub cancel_amount: Option<i64>,
    pub tax_free_amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub order_id: String,
    pub payment_key: String,
    pub cancelled_at: OffsetDateTime,
    pub cancel_reason: String,
    /// Requested amount, or the order total for a full cancellation.
    pub cancel_amount: i64,
    pub gateway_result: serde_json::Value,
    pub ledger: RefundLedgerOutcome,
}

impl From<CancelRejection> for ServiceError {
    fn from(value: CancelRejection) -> Self {
        match value {
            CancelRejection::NotOwner => {
                ServiceError::PermissionDenied("order belongs to another user".to_string())
            }
            CancelRejection::PaymentMismatch => ServiceError::PermissionDenied(
                "payment does not belong to this order".to_string(),
            ),
            CancelRejection::AlreadyCancelled => {
                ServiceError::precondition("order is already cancelled")
            }
            CancelRejection::NotPaid(status) => {
                ServiceError::precondition(format!("order in status {status} cannot be cancelled"))
            }
        }
    }
}

impl Processor<CancelPayment> for PaymentProcessor {
    type Output = CancelOutcome;
    type Error = ServiceError;
    #[tracing::instrument(skip_all, err, name = "CancelPayment", fields(order_id = %input.order_id))]
    async fn process(&self, input: CancelPayment) -> Result<CancelOutcome, ServiceError> {
        let order = self
            .db
            .process(GetOrderById {
                order_id: input.order_id.clone(),
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound("order not found".to_string()))?;
        reconcile::check_cancellable(&order, &input.user_id, &input.payment_key)?;

        let payment = self
            .gateway
            .cancel(
                &input.payment_key,
                &CancelRequest {
                    cancel_reason: input.cancel_reason.clone(),
                    cancel_amount: input.cancel_amount,
                    tax_free_amount: input.tax_free_amount,
                    refund_receive_account: None,
                },
                None,
            )
            .await
            .map_err(|e| ServiceError::gateway("payment cancellation failed", e))?;

        let gateway_result = payment.raw.clone();
        let ledger = self
            .db
            .process(RecordRefund {
                payment_key: input.payment_key.clone(),
                order_id: Some(order.order_id.clone()),
                user_id: input.user_id.clone(),
                cancel_reason: input.cancel_reason.clone(),
                cancel_amount: input.cancel_amount,
                refund_receive_account: None,
                idempotency_key: None,
                gateway_result: payment,
                is_full_refund: reconcile::is_full_refund(
                    input.cancel_amount,
                    Some(order.total_amount),
                ),
            })
            .await
            .inspect_err(|e| {
                error!(
                    payment_key = %input.payment_key,
                    error = %e,
                    "Payment cancelled by gateway but not recorded"
                )
            })?;

        Ok(CancelOutcome {
            order_id: order.order_id,
            payment_key: input.payment_key,
            cancelled_at: ledger.refund.refunded_at,
            cancel_reason: input.cancel_reason,
            cancel_amount: input.cancel_amount.unwrap_or(order.total_amount),
            gateway_result,
            ledger,
        })
    }
}
