use gonggoo_sdk::objects::PaymentStatus;
use kanau::processor::Processor;
use tracing::{error, info, warn};

use super::PaymentProcessor;
use crate::entities::ordered_products::GetOrderCartItemIds;
use crate::entities::orders::OrderRecord;
use crate::entities::payments::UpsertConfirmedPayment;
use crate::entities::users::SoftDeleteCartItems;
use crate::error::ServiceError;
use crate::gateway::{ConfirmRequest, GatewayPayment};
use crate::reconcile::{self, ConfirmSkip};

#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub user_id: String,
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

/// Follow-up work after a confirmed payment. Never fails the confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    OrderConfirmation,
    CartCleanup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectStatus {
    Applied,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectOutcome {
    pub effect: SideEffect,
    pub status: SideEffectStatus,
}

impl SideEffectOutcome {
    fn log(&self, order_id: &str) {
        match &self.status {
            SideEffectStatus::Applied => {
                info!(order_id, effect = ?self.effect, "Side effect applied");
            }
            SideEffectStatus::Skipped(reason) => {
                warn!(order_id, effect = ?self.effect, reason = %reason, "Side effect skipped");
            }
            SideEffectStatus::Failed(message) => {
                error!(order_id, effect = ?self.effect, error = %message, "Side effect failed");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    pub payment: GatewayPayment,
    pub side_effects: Vec<SideEffectOutcome>,
}

impl Processor<ConfirmPayment> for PaymentProcessor {
    type Output = ConfirmOutcome;
    type Error = ServiceError;
    #[tracing::instrument(skip_all, err, name = "ConfirmPayment", fields(order_id = %input.order_id))]
    async fn process(&self, input: ConfirmPayment) -> Result<ConfirmOutcome, ServiceError> {
        let payment = self
            .gateway
            .confirm(&ConfirmRequest {
                payment_key: input.payment_key.clone(),
                order_id: input.order_id.clone(),
                amount: input.amount,
            })
            .await
            .map_err(|e| ServiceError::gateway("payment confirmation failed", e))?;

        self.db
            .process(UpsertConfirmedPayment {
                payment_key: input.payment_key.clone(),
                user_id: input.user_id.clone(),
                order_id: input.order_id.clone(),
                status: payment.status.as_str().to_string(),
                total_amount: payment.total_amount.or(Some(input.amount)),
                gateway_response: payment.raw.clone(),
            })
            .await
            .inspect_err(|e| {
                error!(
                    payment_key = %input.payment_key,
                    error = %e,
                    "Payment confirmed by gateway but not recorded"
                )
            })?;

        let side_effects = vec![
            self.confirm_order(&input, &payment.status).await,
            self.clear_purchased_cart_items(&input).await,
        ];
        for outcome in &side_effects {
            outcome.log(&input.order_id);
        }

        info!(
            payment_key = %input.payment_key,
            status = %payment.status,
            "Payment confirmed"
        );
        Ok(ConfirmOutcome {
            payment,
            side_effects,
        })
    }
}

impl PaymentProcessor {
    async fn confirm_order(
        &self,
        input: &ConfirmPayment,
        status: &PaymentStatus,
    ) -> SideEffectOutcome {
        let result: Result<Result<(), ConfirmSkip>, sqlx::Error> = async {
            let mut tx = self.db.pool.begin().await?;
            let order = OrderRecord::lock_tx(&mut tx, &input.order_id).await?;
            if let Err(skip) = reconcile::confirm_eligibility(order.as_ref()) {
                return Ok(Err(skip));
            }
            OrderRecord::confirm_tx(&mut tx, &input.order_id, &input.payment_key, status.as_str())
                .await?;
            tx.commit().await?;
            Ok(Ok(()))
        }
        .await;

        let status = match result {
            Ok(Ok(())) => SideEffectStatus::Applied,
            Ok(Err(skip)) => SideEffectStatus::Skipped(skip.to_string()),
            Err(e) => SideEffectStatus::Failed(e.to_string()),
        };
        SideEffectOutcome {
            effect: SideEffect::OrderConfirmation,
            status,
        }
    }

    async fn clear_purchased_cart_items(&self, input: &ConfirmPayment) -> SideEffectOutcome {
        let result: Result<u64, sqlx::Error> = async {
            let cart_item_ids = self
                .db
                .process(GetOrderCartItemIds {
                    order_id: input.order_id.clone(),
                })
                .await?;
            self.db
                .process(SoftDeleteCartItems {
                    user_id: input.user_id.clone(),
                    cart_item_ids,
                    reason: format!("order completed ({})", input.order_id),
                })
                .await
        }
        .await;

        let status = match result {
            Ok(0) => SideEffectStatus::Skipped("no cart items to remove".to_string()),
            Ok(_) => SideEffectStatus::Applied,
            Err(e) => SideEffectStatus::Failed(e.to_string()),
        };
        SideEffectOutcome {
            effect: SideEffect::CartCleanup,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_GATEWAY_TIMEOUT, GatewayConfig};
    use crate::entities::OrderStatus;
    use crate::gateway::TossGateway;
    use crate::testing::*;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use sqlx::PgPool;
    use url::Url;

    /// Stand-in gateway that approves 10000 and rejects any other amount.
    async fn fake_gateway() -> TossGateway {
        async fn confirm(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
            if body["amount"] == 10000 {
                (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "paymentKey": body["paymentKey"],
                        "orderId": body["orderId"],
                        "status": "DONE",
                        "totalAmount": 10000
                    })),
                )
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "code": "INVALID_AMOUNT",
                        "message": "amount does not match"
                    })),
                )
            }
        }

        let app = axum::Router::new().route("/v1/payments/confirm", post(confirm));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TossGateway::new(
            reqwest::Client::new(),
            &GatewayConfig {
                base_url: Url::parse(&format!("http://{addr}")).unwrap(),
                secret_key: "test_sk".to_string(),
                timeout: DEFAULT_GATEWAY_TIMEOUT,
            },
        )
    }

    fn confirm_input(amount: i64) -> ConfirmPayment {
        ConfirmPayment {
            user_id: "user-1".to_string(),
            payment_key: "pk".to_string(),
            order_id: "order-1".to_string(),
            amount,
        }
    }

    async fn seed_order(pool: &PgPool, status: OrderStatus) {
        SeedOrder {
            order_id: "order-1",
            user_id: "user-1",
            status,
            total_amount: 10000,
            payment_key: None,
            age_minutes: 1,
        }
        .insert(pool)
        .await;
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn confirmed_payment_moves_pending_order_and_clears_cart(pool: PgPool) {
        seed_user(&pool, "user-1", &["order-1"]).await;
        seed_order(&pool, OrderStatus::Pending).await;
        seed_unit(&pool, "p1", Some("u1"), "1kg", 5).await;
        seed_line_item(&pool, "order-1", "p1", Some("u1"), None, 2).await;
        sqlx::query(
            "INSERT INTO cart_items (user_id, cart_item_id, product_id, unit_id, quantity) VALUES ('user-1', 'cart-1', 'p1', 'u1', 2)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("UPDATE ordered_products SET cart_item_id = 'cart-1' WHERE order_id = 'order-1'")
            .execute(&pool)
            .await
            .unwrap();

        let processor = PaymentProcessor::new(pool.clone(), fake_gateway().await);
        let outcome = processor.process(confirm_input(10000)).await.unwrap();

        assert_eq!(outcome.payment.status, PaymentStatus::Done);
        assert!(
            outcome
                .side_effects
                .iter()
                .all(|effect| effect.status == SideEffectStatus::Applied)
        );
        assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Confirmed, false));
        assert_eq!(payment_status(&pool, "pk").await.as_deref(), Some("DONE"));

        let cart_deleted = sqlx::query_scalar::<_, bool>(
            "SELECT is_deleted FROM cart_items WHERE cart_item_id = 'cart-1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(cart_deleted);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn payment_is_kept_when_order_cannot_be_confirmed(pool: PgPool) {
        seed_order(&pool, OrderStatus::Cancelled).await;

        let processor = PaymentProcessor::new(pool.clone(), fake_gateway().await);
        let outcome = processor.process(confirm_input(10000)).await.unwrap();

        assert_eq!(
            outcome.side_effects[0],
            SideEffectOutcome {
                effect: SideEffect::OrderConfirmation,
                status: SideEffectStatus::Skipped("order is not pending (cancelled)".to_string()),
            }
        );
        assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Cancelled, false));

        let (status, user_id) = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT status, user_id FROM payments WHERE payment_key = 'pk'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "DONE");
        assert_eq!(user_id.as_deref(), Some("user-1"));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn payment_is_kept_when_order_is_missing(pool: PgPool) {
        let processor = PaymentProcessor::new(pool.clone(), fake_gateway().await);
        let outcome = processor.process(confirm_input(10000)).await.unwrap();

        assert_eq!(
            outcome.side_effects[0].status,
            SideEffectStatus::Skipped("order not found".to_string())
        );
        assert_eq!(payment_status(&pool, "pk").await.as_deref(), Some("DONE"));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn gateway_rejection_writes_nothing(pool: PgPool) {
        seed_order(&pool, OrderStatus::Pending).await;

        let processor = PaymentProcessor::new(pool.clone(), fake_gateway().await);
        let err = processor.process(confirm_input(9999)).await.unwrap_err();

        assert_eq!(err.status(), gonggoo_sdk::objects::ErrorStatus::FailedPrecondition);
        assert_eq!(payment_status(&pool, "pk").await, None);
        assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Pending, false));
    }
}

