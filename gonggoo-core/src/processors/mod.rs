//! Payment operations.
//!
//! - `PaymentProcessor`: confirm, cancel and refund through the gateway
//! - `FailureCleanupProcessor`: release a pending order whose payment did not complete
//! - `WebhookDispatcher`: route gateway notifications to the above
//! - `StaleOrderSweeper`: periodically release abandoned pending orders

pub mod cancel_payment;
pub mod confirm_payment;
pub mod failure_cleanup;
pub mod refund_ledger;
pub mod refund_payment;
pub mod stale_order_sweeper;
pub mod webhook_dispatcher;

pub use cancel_payment::{CancelOutcome, CancelPayment};
pub use confirm_payment::{
    ConfirmOutcome, ConfirmPayment, SideEffect, SideEffectOutcome, SideEffectStatus,
};
pub use failure_cleanup::{
    CleanupError, CleanupOrder, CleanupOutcome, CleanupTrigger, FailureCleanupProcessor,
    OrderLocator,
};
pub use refund_ledger::{RecordRefund, RefundLedgerOutcome};
pub use refund_payment::{RefundOutcome, RefundPayment};
pub use stale_order_sweeper::StaleOrderSweeper;
pub use webhook_dispatcher::{DispatchOutcome, WebhookDispatchError, WebhookDispatcher};

use sqlx::PgPool;

use crate::framework::DatabaseProcessor;
use crate::gateway::TossGateway;

/// Runs the caller-facing payment operations.
///
/// Every operation calls the gateway first and only writes locally once the
/// gateway has accepted, so a gateway failure leaves no local state.
#[derive(Clone)]
pub struct PaymentProcessor {
    db: DatabaseProcessor,
    gateway: TossGateway,
}

impl PaymentProcessor {
    pub fn new(pool: PgPool, gateway: TossGateway) -> Self {
        Self {
            db: DatabaseProcessor::new(pool),
            gateway,
        }
    }
}
