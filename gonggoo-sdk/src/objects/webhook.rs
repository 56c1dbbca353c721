//! Inbound payment webhook payload.

use serde::{Deserialize, Serialize};

use super::payments::PaymentStatus;

/// Event type discriminator of a gateway webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    PaymentStatusChanged,
    PaymentFailed,
    PaymentCanceled,
    PaymentExpired,
    /// Any event type this service does not handle.
    Other(String),
}

impl From<String> for WebhookEventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PAYMENT_STATUS_CHANGED" => WebhookEventType::PaymentStatusChanged,
            "PAYMENT_FAILED" => WebhookEventType::PaymentFailed,
            "PAYMENT_CANCELED" => WebhookEventType::PaymentCanceled,
            "PAYMENT_EXPIRED" => WebhookEventType::PaymentExpired,
            _ => WebhookEventType::Other(value),
        }
    }
}

impl From<WebhookEventType> for String {
    fn from(value: WebhookEventType) -> Self {
        match value {
            WebhookEventType::PaymentStatusChanged => "PAYMENT_STATUS_CHANGED".to_owned(),
            WebhookEventType::PaymentFailed => "PAYMENT_FAILED".to_owned(),
            WebhookEventType::PaymentCanceled => "PAYMENT_CANCELED".to_owned(),
            WebhookEventType::PaymentExpired => "PAYMENT_EXPIRED".to_owned(),
            WebhookEventType::Other(s) => s,
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// `{ "eventType": ..., "data": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub event_type: WebhookEventType,
    #[serde(default)]
    pub data: PaymentEventData,
}

/// Payment fields the dispatcher reads; every other field is kept in
/// `extra` so the stored webhook payload is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// RFC 3339 expiry time, only on `PAYMENT_EXPIRED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentEventData {
    /// The full payload as JSON, for storing alongside the payment.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_changed_envelope() {
        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{
                "eventType": "PAYMENT_STATUS_CHANGED",
                "createdAt": "2024-02-13T12:18:14.000000",
                "data": {
                    "paymentKey": "pk_1",
                    "status": "FAILED",
                    "orderId": "order-1",
                    "method": "CARD"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(envelope.event_type, WebhookEventType::PaymentStatusChanged);
        assert_eq!(envelope.data.payment_key.as_deref(), Some("pk_1"));
        assert_eq!(envelope.data.status, Some(PaymentStatus::Failed));
        assert_eq!(envelope.data.extra["method"], "CARD");

        let stored = envelope.data.to_value();
        assert_eq!(stored["method"], "CARD");
        assert_eq!(stored["orderId"], "order-1");
    }

    #[test]
    fn test_unknown_event_type_and_missing_data() {
        let envelope: WebhookEnvelope =
            serde_json::from_str(r#"{"eventType": "DEPOSIT_CALLBACK"}"#).unwrap();
        assert_eq!(
            envelope.event_type,
            WebhookEventType::Other("DEPOSIT_CALLBACK".to_string())
        );
        assert!(envelope.data.payment_key.is_none());
        assert_eq!(envelope.event_type.to_string(), "DEPOSIT_CALLBACK");
    }
}
