use axum::{Json, extract::State};
use gonggoo_core::processors::RefundPayment;
use gonggoo_sdk::objects::{RefundPaymentRequest, RefundPaymentResponse};
use kanau::processor::Processor;

use super::{optional_amount, required};
use crate::api::error::ApiError;
use crate::api::extractors::{AuthenticatedUser, CallableJson};
use crate::state::AppState;

/// `POST /refundPayment`
///
/// Retrying with the same `idempotencyKey` returns the gateway's original
/// result instead of refunding twice.
pub(super) async fn refund_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    CallableJson(req): CallableJson<RefundPaymentRequest>,
) -> Result<Json<RefundPaymentResponse>, ApiError> {
    let payment_key = required(req.payment_key, "paymentKey")?;
    let cancel_reason = required(req.cancel_reason, "cancelReason")?;
    let cancel_amount = optional_amount(req.cancel_amount, "cancelAmount")?;

    let outcome = state
        .payment_processor()
        .await
        .process(RefundPayment {
            user_id: user.user_id,
            payment_key,
            cancel_reason,
            cancel_amount,
            refund_receive_account: req.refund_receive_account,
            idempotency_key: req.idempotency_key.filter(|k| !k.is_empty()),
            tax_free_amount: req.tax_breakdown.and_then(|t| t.tax_free_amount),
        })
        .await?;

    Ok(Json(RefundPaymentResponse {
        success: true,
        refund: outcome.refund,
        order_id: outcome.order_id,
        is_full_refund: outcome.is_full_refund,
    }))
}
