use axum::{Json, extract::State};
use gonggoo_core::processors::CancelPayment;
use gonggoo_sdk::objects::{CancelPaymentRequest, CancelPaymentResponse};
use kanau::processor::Processor;

use super::{optional_amount, required};
use crate::api::error::ApiError;
use crate::api::extractors::{AuthenticatedUser, CallableJson};
use crate::state::AppState;

/// `POST /cancelPayment`
pub(super) async fn cancel_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    CallableJson(req): CallableJson<CancelPaymentRequest>,
) -> Result<Json<CancelPaymentResponse>, ApiError> {
    let payment_key = required(req.payment_key, "paymentKey")?;
    let order_id = required(req.order_id, "orderId")?;
    let cancel_reason = required(req.cancel_reason, "cancelReason")?;
    let cancel_amount = optional_amount(req.cancel_amount, "cancelAmount")?;

    let outcome = state
        .payment_processor()
        .await
        .process(CancelPayment {
            user_id: user.user_id,
            payment_key,
            order_id,
            cancel_reason,
            cancel_amount,
            tax_free_amount: req.tax_breakdown.and_then(|t| t.tax_free_amount),
        })
        .await?;

    Ok(Json(CancelPaymentResponse {
        success: true,
        order_id: outcome.order_id,
        payment_key: outcome.payment_key,
        cancelled_at: (outcome.cancelled_at.unix_timestamp_nanos() / 1_000_000) as i64,
        cancel_reason: outcome.cancel_reason,
        cancel_amount: outcome.cancel_amount,
        gateway_result: outcome.gateway_result,
    }))
}
