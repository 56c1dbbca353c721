pub mod error;
pub mod orders;
pub mod payments;
pub mod refunds;
pub mod webhook;

pub use error::{ErrorBody, ErrorDetail, ErrorStatus};
pub use orders::{
    DeletePendingOrderRequest, DeletePendingOrderResponse, OrderStatus, StockRestoration,
};
pub use payments::{
    CancelPaymentRequest, CancelPaymentResponse, ConfirmPaymentRequest, ConfirmPaymentResponse,
    PaymentStatus, RefundPaymentRequest, RefundPaymentResponse, RefundReceiveAccount,
    TaxBreakdown,
};
pub use refunds::{GetUserRefundsRequest, GetUserRefundsResponse, RefundView, clamp_refund_limit};
pub use webhook::{PaymentEventData, WebhookEnvelope, WebhookEventType};
