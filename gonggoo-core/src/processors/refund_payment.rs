use gonggoo_sdk::objects::RefundReceiveAccount;
use kanau::processor::Processor;
use tracing::error;

use super::PaymentProcessor;
use super::refund_ledger::{RecordRefund, RefundLedgerOutcome};
use crate::entities::orders::GetOrderByPaymentKey;
use crate::entities::payments::GetPaymentByKey;
use crate::error::ServiceError;
use crate::gateway::CancelRequest;
use crate::reconcile;

/// Refund all or part of a payment, optionally to a bank account.
#[derive(Debug, Clone)]
pub struct RefundPayment {
    pub user_id: String,
    pub payment_key: String,
    pub cancel_reason: String,
    pub cancel_amount: Option<i64>,
    pub refund_receive_account: Option<RefundReceiveAccount>,
    pub idempotency_key: Option<String>,
    pub tax_free_amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub refund: serde_json::Value,
    pub order_id: Option<String>,
    pub is_full_refund: bool,
    pub ledger: RefundLedgerOutcome,
}

/// A record with no owner proves nothing, so it is refused like a stranger's.
fn ensure_refund_owner(owner: Option<&str>, caller: &str) -> Result<(), ServiceError> {
    match owner {
        Some(owner) if owner == caller => Ok(()),
        _ => Err(ServiceError::PermissionDenied(
            "payment belongs to another user".to_string(),
        )),
    }
}

impl Processor<RefundPayment> for PaymentProcessor {
    type Output = RefundOutcome;
    type Error = ServiceError;
    #[tracing::instrument(skip_all, err, name = "RefundPayment", fields(payment_key = %input.payment_key))]
    async fn process(&self, input: RefundPayment) -> Result<RefundOutcome, ServiceError> {
        let order = self
            .db
            .process(GetOrderByPaymentKey {
                payment_key: input.payment_key.clone(),
            })
            .await?;

        // Without an order, the payment record is the only proof of ownership.
        match &order {
            Some(order) => ensure_refund_owner(Some(order.user_id.as_str()), &input.user_id)?,
            None => {
                let payment = self
                    .db
                    .process(GetPaymentByKey {
                        payment_key: input.payment_key.clone(),
                    })
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("payment not found".to_string()))?;
                ensure_refund_owner(payment.user_id.as_deref(), &input.user_id)?;
            }
        }

        let payment = self
            .gateway
            .cancel(
                &input.payment_key,
                &CancelRequest {
                    cancel_reason: input.cancel_reason.clone(),
                    cancel_amount: input.cancel_amount,
                    tax_free_amount: input.tax_free_amount,
                    refund_receive_account: input.refund_receive_account.clone(),
                },
                input.idempotency_key.as_deref(),
            )
            .await
            .map_err(|e| ServiceError::gateway("refund failed", e))?;

        let order_id = order.as_ref().map(|o| o.order_id.clone());
        let is_full_refund = reconcile::is_full_refund(
            input.cancel_amount,
            order.as_ref().map(|o| o.total_amount),
        );
        let refund = payment.raw.clone();
        let ledger = self
            .db
            .process(RecordRefund {
                payment_key: input.payment_key.clone(),
                order_id: order_id.clone(),
                user_id: input.user_id,
                cancel_reason: input.cancel_reason,
                cancel_amount: input.cancel_amount,
                refund_receive_account: input.refund_receive_account,
                idempotency_key: input.idempotency_key,
                gateway_result: payment,
                is_full_refund,
            })
            .await
            .inspect_err(|e| {
                error!(
                    payment_key = %input.payment_key,
                    error = %e,
                    "Refund executed by gateway but not recorded"
                )
            })?;

        Ok(RefundOutcome {
            refund,
            order_id,
            is_full_refund,
            ledger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_GATEWAY_TIMEOUT, GatewayConfig};
    use crate::entities::OrderStatus;
    use crate::gateway::TossGateway;
    use crate::testing::*;
    use gonggoo_sdk::objects::ErrorStatus;
    use sqlx::PgPool;
    use url::Url;

    #[test]
    fn only_the_recorded_owner_may_refund() {
        assert!(ensure_refund_owner(Some("user-1"), "user-1").is_ok());
        assert_eq!(
            ensure_refund_owner(Some("user-2"), "user-1").unwrap_err().status(),
            ErrorStatus::PermissionDenied
        );
        assert_eq!(
            ensure_refund_owner(None, "user-1").unwrap_err().status(),
            ErrorStatus::PermissionDenied
        );
    }

    /// Points at a closed port. The owner checks run before any gateway call.
    fn unreachable_gateway() -> TossGateway {
        TossGateway::new(
            reqwest::Client::new(),
            &GatewayConfig {
                base_url: Url::parse("http://127.0.0.1:9").unwrap(),
                secret_key: "test_sk".to_string(),
                timeout: DEFAULT_GATEWAY_TIMEOUT,
            },
        )
    }

    fn refund_by(user_id: &str) -> RefundPayment {
        RefundPayment {
            user_id: user_id.to_string(),
            payment_key: "pk".to_string(),
            cancel_reason: "changed my mind".to_string(),
            cancel_amount: None,
            refund_receive_account: None,
            idempotency_key: None,
            tax_free_amount: None,
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn ownerless_payment_without_order_is_refused(pool: PgPool) {
        seed_payment(&pool, "pk", None, None, "DONE").await;
        let processor = PaymentProcessor::new(pool.clone(), unreachable_gateway());

        let err = processor.process(refund_by("user-1")).await.unwrap_err();
        assert_eq!(err.status(), ErrorStatus::PermissionDenied);
        assert_eq!(payment_status(&pool, "pk").await.as_deref(), Some("DONE"));
        let refunds = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refunds")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(refunds, 0);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn another_users_order_is_refused(pool: PgPool) {
        SeedOrder {
            order_id: "order-1",
            user_id: "user-2",
            status: OrderStatus::Confirmed,
            total_amount: 10000,
            payment_key: Some("pk"),
            age_minutes: 10,
        }
        .insert(&pool)
        .await;
        let processor = PaymentProcessor::new(pool.clone(), unreachable_gateway());

        let err = processor.process(refund_by("user-1")).await.unwrap_err();
        assert_eq!(err.status(), ErrorStatus::PermissionDenied);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn unknown_payment_is_not_found(pool: PgPool) {
        let processor = PaymentProcessor::new(pool, unreachable_gateway());

        let err = processor.process(refund_by("user-1")).await.unwrap_err();
        assert_eq!(err.status(), ErrorStatus::NotFound);
    }
}

