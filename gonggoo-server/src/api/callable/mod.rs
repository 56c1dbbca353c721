//! Callable API handlers.
//!
//! These endpoints are called by the mobile app and require a session
//! token in the `Authorization: Bearer` header.
//!
//! # Endpoints
//!
//! - `POST /confirmPayment`                     – confirm a payment with the gateway
//! - `POST /cancelPayment`                      – cancel a paid order
//! - `POST /refundPayment`                      – refund all or part of a payment
//! - `POST /getUserRefunds`                     – page through the caller's refunds
//! - `POST /deletePendingOrderOnPaymentFailure` – release a pending order after a failed payment

use axum::{Router, routing::post};

use super::error::ApiError;
use crate::state::AppState;

mod cancel_payment;
mod confirm_payment;
mod delete_pending_order;
mod get_user_refunds;
mod refund_payment;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/confirmPayment", post(confirm_payment::confirm_payment))
        .route("/cancelPayment", post(cancel_payment::cancel_payment))
        .route("/refundPayment", post(refund_payment::refund_payment))
        .route("/getUserRefunds", post(get_user_refunds::get_user_refunds))
        .route(
            "/deletePendingOrderOnPaymentFailure",
            post(delete_pending_order::delete_pending_order),
        )
}

/// A required string field. Absent and empty are both rejected.
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_argument(format!("{field} is required")))
}

fn positive_amount(value: Option<i64>, field: &str) -> Result<i64, ApiError> {
    match value {
        Some(amount) if amount > 0 => Ok(amount),
        Some(_) => Err(ApiError::invalid_argument(format!(
            "{field} must be positive"
        ))),
        None => Err(ApiError::invalid_argument(format!("{field} is required"))),
    }
}

/// An optional amount must still be positive when given.
fn optional_amount(value: Option<i64>, field: &str) -> Result<Option<i64>, ApiError> {
    value.map(|v| positive_amount(Some(v), field)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonggoo_core::error::ServiceError;

    fn message(err: ApiError) -> String {
        match err.0 {
            ServiceError::InvalidArgument(m) => m,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_required_rejects_missing_and_blank() {
        assert_eq!(
            required(Some("pk".to_string()), "paymentKey").unwrap(),
            "pk"
        );
        assert_eq!(
            message(required(None, "paymentKey").unwrap_err()),
            "paymentKey is required"
        );
        assert_eq!(
            message(required(Some("  ".to_string()), "orderId").unwrap_err()),
            "orderId is required"
        );
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(positive_amount(Some(1000), "amount").unwrap(), 1000);
        assert_eq!(
            message(positive_amount(Some(0), "amount").unwrap_err()),
            "amount must be positive"
        );
        assert_eq!(
            message(positive_amount(None, "amount").unwrap_err()),
            "amount is required"
        );
        assert_eq!(optional_amount(None, "cancelAmount").unwrap(), None);
        assert!(optional_amount(Some(-5), "cancelAmount").is_err());
    }
}
