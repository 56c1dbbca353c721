//! Refund history query types.

use serde::{Deserialize, Serialize};

use super::payments::RefundReceiveAccount;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Clamp a requested page size to `1..=100`.
pub fn clamp_refund_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserRefundsRequest {
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Id of the last refund of the previous page.
    #[serde(default)]
    pub start_after: Option<String>,
}

impl Default for GetUserRefundsRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            start_after: None,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// A refund record as returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundView {
    pub id: String,
    pub payment_key: String,
    pub order_id: Option<String>,
    pub cancel_reason: String,
    pub cancel_amount: Option<i64>,
    pub refund_receive_account: Option<RefundReceiveAccount>,
    pub idempotency_key: Option<String>,
    pub refund_result: serde_json::Value,
    pub is_full_refund: bool,
    /// Unix timestamp in milliseconds.
    pub refunded_at: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserRefundsResponse {
    pub success: bool,
    pub refunds: Vec<RefundView>,
    pub has_more: bool,
}
