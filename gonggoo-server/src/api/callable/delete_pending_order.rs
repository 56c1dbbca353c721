use axum::{Json, extract::State};
use gonggoo_core::error::ServiceError;
use gonggoo_core::processors::{CleanupOrder, CleanupOutcome, CleanupTrigger, OrderLocator};
use gonggoo_core::reconcile::CleanupSkip;
use gonggoo_sdk::objects::{DeletePendingOrderRequest, DeletePendingOrderResponse};
use kanau::processor::Processor;

use super::required;
use crate::api::error::ApiError;
use crate::api::extractors::{AuthenticatedUser, CallableJson};
use crate::state::AppState;

/// `POST /deletePendingOrderOnPaymentFailure`
///
/// An order that cannot be released (already gone, no longer pending, paid)
/// is answered with `success: false` rather than an error.
pub(super) async fn delete_pending_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    CallableJson(req): CallableJson<DeletePendingOrderRequest>,
) -> Result<Json<DeletePendingOrderResponse>, ApiError> {
    let order_id = required(req.order_id, "orderId")?;
    tracing::info!(order_id = %order_id, user_id = %user.user_id, "Client reported payment failure");

    let outcome = state
        .cleanup_processor()
        .process(CleanupOrder {
            locator: OrderLocator::OrderId(order_id.clone()),
            trigger: CleanupTrigger::Client {
                user_id: user.user_id,
                reason: req.reason.filter(|r| !r.is_empty()),
            },
        })
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(to_response(order_id, outcome)))
}

fn to_response(order_id: String, outcome: CleanupOutcome) -> DeletePendingOrderResponse {
    match outcome {
        CleanupOutcome::Cleaned {
            order_id,
            restorations,
            deleted_line_items,
        } => DeletePendingOrderResponse {
            success: true,
            message: "pending order deleted".to_string(),
            order_id,
            current_status: None,
            stock_restorations: Some(restorations),
            deleted_product_count: Some(deleted_line_items),
        },
        CleanupOutcome::Skipped { reason, .. } => DeletePendingOrderResponse {
            success: false,
            message: reason.to_string(),
            order_id,
            current_status: match reason {
                CleanupSkip::NotPending(status) => Some(status.into()),
                _ => None,
            },
            stock_restorations: None,
            deleted_product_count: None,
        },
    }
}
