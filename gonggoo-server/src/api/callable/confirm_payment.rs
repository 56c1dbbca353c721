use axum::{Json, extract::State};
use gonggoo_core::processors::ConfirmPayment;
use gonggoo_sdk::objects::{ConfirmPaymentRequest, ConfirmPaymentResponse};
use kanau::processor::Processor;

use super::{positive_amount, required};
use crate::api::error::ApiError;
use crate::api::extractors::{AuthenticatedUser, CallableJson};
use crate::state::AppState;

/// `POST /confirmPayment`
///
/// Only a failed gateway call or a failed payment write fails the request.
/// Order and cart updates are reported in the logs.
pub(super) async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    CallableJson(req): CallableJson<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let payment_key = required(req.payment_key, "paymentKey")?;
    let order_id = required(req.order_id, "orderId")?;
    let amount = positive_amount(req.amount, "amount")?;

    let outcome = state
        .payment_processor()
        .await
        .process(ConfirmPayment {
            user_id: user.user_id,
            payment_key,
            order_id,
            amount,
        })
        .await?;

    Ok(Json(ConfirmPaymentResponse {
        success: true,
        payment: outcome.payment.raw,
    }))
}
