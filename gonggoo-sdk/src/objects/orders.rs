//! Order types exposed by the callable API.

use serde::{Deserialize, Serialize};

/// Order status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `gonggoo-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One stock counter change applied while releasing an order.
///
/// Also persisted inside deletion logs, so the field names are part of the
/// audit format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRestoration {
    pub product_id: String,
    pub product_name: String,
    pub unit_id: Option<String>,
    pub unit_label: Option<String>,
    pub quantity: i32,
    pub stock_before: i32,
    pub stock_after: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePendingOrderRequest {
    pub order_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePendingOrderResponse {
    pub success: bool,
    pub message: String,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_restorations: Option<Vec<StockRestoration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_product_count: Option<u64>,
}
