pub mod cleanup_runs;
pub mod deletion_logs;
pub mod ordered_products;
pub mod orders;
pub mod payments;
pub mod products;
pub mod refunds;
pub mod users;

use gonggoo_sdk::objects::OrderStatus as SdkOrderStatus;
use serde::Serialize;

/// Order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `gonggoo_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase", type_name = "order_status")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Pending => SdkOrderStatus::Pending,
            OrderStatus::Confirmed => SdkOrderStatus::Confirmed,
            OrderStatus::Paid => SdkOrderStatus::Paid,
            OrderStatus::Cancelled => SdkOrderStatus::Cancelled,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::Pending => OrderStatus::Pending,
            SdkOrderStatus::Confirmed => OrderStatus::Confirmed,
            SdkOrderStatus::Paid => OrderStatus::Paid,
            SdkOrderStatus::Cancelled => OrderStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkOrderStatus::from(*self).fmt(f)
    }
}
