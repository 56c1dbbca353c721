//! Payment confirmation, cancellation and refund bodies.
//!
//! Request fields that the server must validate are `Option`s so that a
//! missing field surfaces as an `INVALID_ARGUMENT` error instead of a JSON
//! rejection.

use serde::{Deserialize, Serialize};

/// Payment status as reported by the gateway.
///
/// Unknown statuses are kept verbatim in [`PaymentStatus::Other`] so that
/// a new gateway status never breaks webhook handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Ready,
    InProgress,
    WaitingForDeposit,
    Done,
    Canceled,
    PartialCanceled,
    Aborted,
    Expired,
    Failed,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Ready => "READY",
            PaymentStatus::InProgress => "IN_PROGRESS",
            PaymentStatus::WaitingForDeposit => "WAITING_FOR_DEPOSIT",
            PaymentStatus::Done => "DONE",
            PaymentStatus::Canceled => "CANCELED",
            PaymentStatus::PartialCanceled => "PARTIAL_CANCELED",
            PaymentStatus::Aborted => "ABORTED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Other(s) => s,
        }
    }

    /// Terminal failure statuses that release a pending order.
    ///
    /// `PARTIAL_CANCELED` is deliberately excluded: the payment still holds money.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Failed
                | PaymentStatus::Canceled
                | PaymentStatus::Aborted
                | PaymentStatus::Expired
        )
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "READY" => PaymentStatus::Ready,
            "IN_PROGRESS" => PaymentStatus::InProgress,
            "WAITING_FOR_DEPOSIT" => PaymentStatus::WaitingForDeposit,
            "DONE" => PaymentStatus::Done,
            "CANCELED" => PaymentStatus::Canceled,
            "PARTIAL_CANCELED" => PaymentStatus::PartialCanceled,
            "ABORTED" => PaymentStatus::Aborted,
            "EXPIRED" => PaymentStatus::Expired,
            "FAILED" => PaymentStatus::Failed,
            _ => PaymentStatus::Other(value),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tax split of a cancellation. The gateway derives VAT itself, so only the
/// tax-exempt part is forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_free_amount: Option<i64>,
}

/// Bank account that receives a virtual-account refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundReceiveAccount {
    pub bank: String,
    pub account_number: String,
    pub holder_name: String,
}

// ---------------------------------------------------------------------------
// confirmPayment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_key: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    /// The gateway's payment object, stored verbatim as the payment record.
    pub payment: serde_json::Value,
}

// ---------------------------------------------------------------------------
// cancelPayment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentRequest {
    pub payment_key: Option<String>,
    pub order_id: Option<String>,
    pub cancel_reason: Option<String>,
    /// Partial cancellation amount; `None` cancels the whole order.
    #[serde(default)]
    pub cancel_amount: Option<i64>,
    #[serde(default)]
    pub tax_breakdown: Option<TaxBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentResponse {
    pub success: bool,
    pub order_id: String,
    pub payment_key: String,
    /// Unix timestamp of the cancellation in milliseconds.
    pub cancelled_at: i64,
    pub cancel_reason: String,
    pub cancel_amount: i64,
    pub gateway_result: serde_json::Value,
}

// ---------------------------------------------------------------------------
// refundPayment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    pub payment_key: Option<String>,
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancel_amount: Option<i64>,
    #[serde(default)]
    pub refund_receive_account: Option<RefundReceiveAccount>,
    /// Forwarded to the gateway as `Idempotency-Key`.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub tax_breakdown: Option<TaxBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentResponse {
    pub success: bool,
    pub refund: serde_json::Value,
    pub order_id: Option<String>,
    pub is_full_refund: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_round_trips_unknown_values() {
        let status: PaymentStatus = serde_json::from_str("\"NEW_STATUS\"").unwrap();
        assert_eq!(status, PaymentStatus::Other("NEW_STATUS".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"NEW_STATUS\"");
    }

    #[test]
    fn test_failure_statuses() {
        for s in ["FAILED", "CANCELED", "ABORTED", "EXPIRED"] {
            assert!(PaymentStatus::from(s.to_string()).is_failure(), "{s}");
        }
        for s in ["DONE", "PARTIAL_CANCELED", "READY", "IN_PROGRESS", "SOMETHING"] {
            assert!(!PaymentStatus::from(s.to_string()).is_failure(), "{s}");
        }
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let req: ConfirmPaymentRequest =
            serde_json::from_str(r#"{"paymentKey":"pk_1","amount":1000}"#).unwrap();
        assert_eq!(req.payment_key.as_deref(), Some("pk_1"));
        assert!(req.order_id.is_none());
        assert_eq!(req.amount, Some(1000));
    }

    #[test]
    fn test_refund_request_camel_case() {
        let req: RefundPaymentRequest = serde_json::from_str(
            r#"{
                "paymentKey": "pk_1",
                "cancelReason": "changed mind",
                "cancelAmount": 500,
                "idempotencyKey": "idem-1",
                "taxBreakdown": {"taxFreeAmount": 100},
                "refundReceiveAccount": {"bank": "88", "accountNumber": "123", "holderName": "Kim"}
            }"#,
        )
        .unwrap();
        assert_eq!(req.cancel_amount, Some(500));
        assert_eq!(req.idempotency_key.as_deref(), Some("idem-1"));
        assert_eq!(req.tax_breakdown.unwrap().tax_free_amount, Some(100));
        assert_eq!(req.refund_receive_account.unwrap().holder_name, "Kim");
    }
}
