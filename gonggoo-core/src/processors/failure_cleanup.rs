//! Release a pending order whose payment did not complete.
//!
//! Stock goes back to the exact units that were sold, line items are
//! removed, the order leaves the owner's list and is soft-deleted, and an
//! audit log keeps the pre-deletion snapshot. All of it is one transaction.
//!
//! Three callers share this rule: the webhook dispatcher, the client RPC and
//! the stale order sweeper. The first and last go through
//! [`FailureCleanupProcessor::run_isolated`] so a cleanup failure never
//! fails their own work.

use gonggoo_sdk::objects::{PaymentStatus, StockRestoration};
use itertools::Itertools;
use kanau::processor::Processor;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::entities::deletion_logs::NewDeletionLog;
use crate::entities::ordered_products::OrderedProduct;
use crate::entities::orders::OrderRecord;
use crate::entities::payments::PaymentRecord;
use crate::entities::products::ProductUnit;
use crate::entities::users::User;
use crate::error::ServiceError;
use crate::reconcile::{self, CleanupSkip};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLocator {
    OrderId(String),
    /// The most recent order carrying this payment key.
    PaymentKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupTrigger {
    /// Gateway notification reporting a terminal failure status.
    Webhook {
        payment_key: Option<String>,
        payment_status: PaymentStatus,
    },
    /// The app reporting a payment failure it saw on the device.
    Client {
        user_id: String,
        reason: Option<String>,
    },
    Sweep {
        stale_after_minutes: u64,
    },
}

impl CleanupTrigger {
    /// Recorded as `deleted_by` in the deletion log.
    pub fn deleted_by(&self) -> &'static str {
        match self {
            CleanupTrigger::Webhook { .. } => "payment_webhook_handler",
            CleanupTrigger::Client { .. } => "payment_failure_function",
            CleanupTrigger::Sweep { .. } => "stale_order_sweeper",
        }
    }

    pub fn reason(&self) -> String {
        match self {
            CleanupTrigger::Webhook { payment_status, .. } => {
                format!("payment {payment_status} (webhook)")
            }
            CleanupTrigger::Client { reason, .. } => reason
                .clone()
                .unwrap_or_else(|| "payment failed".to_string()),
            CleanupTrigger::Sweep {
                stale_after_minutes,
            } => format!("pending for more than {stale_after_minutes} minutes"),
        }
    }

    fn webhook_payment(&self) -> (Option<String>, Option<String>) {
        match self {
            CleanupTrigger::Webhook {
                payment_key,
                payment_status,
            } => (
                payment_key.clone(),
                Some(payment_status.as_str().to_string()),
            ),
            _ => (None, None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanupOrder {
    pub locator: OrderLocator,
    pub trigger: CleanupTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Cleaned {
        order_id: String,
        restorations: Vec<StockRestoration>,
        deleted_line_items: u64,
    },
    Skipped {
        order_id: Option<String>,
        reason: CleanupSkip,
    },
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("order {order_id} belongs to another user")]
    PermissionDenied { order_id: String },

    #[error("snapshot serialization error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl From<CleanupError> for ServiceError {
    fn from(err: CleanupError) -> Self {
        match err {
            CleanupError::Database(e) => ServiceError::Database(e),
            CleanupError::PermissionDenied { .. } => {
                ServiceError::PermissionDenied("order belongs to another user".to_string())
            }
            CleanupError::Snapshot(e) => ServiceError::Internal(e.to_string()),
        }
    }
}

/// Pre-deletion state kept in the deletion log.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderSnapshot<'a> {
    order: &'a OrderRecord,
    ordered_products: &'a [OrderedProduct],
}

#[derive(Clone)]
pub struct FailureCleanupProcessor {
    pool: PgPool,
}

impl FailureCleanupProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the cleanup and swallow any error after logging it.
    pub async fn run_isolated(&self, request: CleanupOrder) -> Option<CleanupOutcome> {
        let trigger = request.trigger.deleted_by();
        match self.process(request).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(trigger, error = %e, "Pending order cleanup failed");
                None
            }
        }
    }
}

impl Processor<CleanupOrder> for FailureCleanupProcessor {
    type Output = CleanupOutcome;
    type Error = CleanupError;
    #[tracing::instrument(skip_all, err, name = "SQL:CleanupOrder", fields(locator = ?request.locator))]
    async fn process(&self, request: CleanupOrder) -> Result<CleanupOutcome, CleanupError> {
        let mut tx = self.pool.begin().await?;

        let order = match &request.locator {
            OrderLocator::OrderId(order_id) => OrderRecord::lock_tx(&mut tx, order_id).await?,
            OrderLocator::PaymentKey(payment_key) => {
                let order_id = sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT order_id FROM orders
                    WHERE payment_key = $1
                    ORDER BY created_at DESC
                    LIMIT 1
                    "#,
                )
                .bind(payment_key)
                .fetch_optional(&mut *tx)
                .await?;
                match order_id {
                    Some(order_id) => OrderRecord::lock_tx(&mut tx, &order_id).await?,
                    None => None,
                }
            }
        };

        if let (CleanupTrigger::Client { user_id, .. }, Some(order)) = (&request.trigger, &order) {
            if &order.user_id != user_id {
                return Err(CleanupError::PermissionDenied {
                    order_id: order.order_id.clone(),
                });
            }
        }

        let payments = match &order {
            Some(order) => {
                let payment_key = order.payment_key.as_deref().or(match &request.locator {
                    OrderLocator::PaymentKey(payment_key) => Some(payment_key.as_str()),
                    OrderLocator::OrderId(_) => None,
                });
                PaymentRecord::lock_for_order_tx(&mut tx, &order.order_id, payment_key).await?
            }
            None => Vec::new(),
        };

        let order = match reconcile::cleanup_eligibility(order.as_ref(), &payments) {
            Ok(order) => order.clone(),
            Err(reason) => {
                let order_id = order.as_ref().map(|o| o.order_id.clone());
                info!(order_id = ?order_id, reason = %reason, "Pending order cleanup skipped");
                return Ok(CleanupOutcome::Skipped { order_id, reason });
            }
        };

        let items = OrderedProduct::list_for_order_tx(&mut tx, &order.order_id).await?;
        let product_ids = items
            .iter()
            .map(|item| item.product_id.clone())
            .unique()
            .collect_vec();
        let units = ProductUnit::lock_for_products_tx(&mut tx, &product_ids).await?;
        let owner_exists = User::lock_tx(&mut tx, &order.user_id).await?;

        let plan = reconcile::plan_stock_restoration(&items, &units);
        let snapshot = serde_json::to_value(OrderSnapshot {
            order: &order,
            ordered_products: &items,
        })?;
        let (payment_key, payment_status) = request.trigger.webhook_payment();
        let log = NewDeletionLog {
            order_id: order.order_id.clone(),
            user_id: Some(order.user_id.clone()),
            reason: request.trigger.reason(),
            payment_key,
            payment_status,
            original_order_data: snapshot,
            stock_restorations: serde_json::to_value(&plan.restorations)?,
            deleted_by: request.trigger.deleted_by(),
            webhook_triggered: matches!(request.trigger, CleanupTrigger::Webhook { .. }),
        };

        ProductUnit::apply_stock_tx(&mut tx, &plan.updates).await?;
        let deleted_line_items = OrderedProduct::delete_for_order_tx(&mut tx, &order.order_id).await?;
        if owner_exists {
            User::remove_order_tx(&mut tx, &order.user_id, &order.order_id).await?;
        } else {
            warn!(user_id = %order.user_id, "Order owner not found, order list left as is");
        }
        log.insert_tx(&mut tx).await?;
        OrderRecord::soft_delete_tx(&mut tx, &order.order_id).await?;

        tx.commit().await?;

        if !plan.unmatched.is_empty() {
            warn!(
                order_id = %order.order_id,
                line_items = ?plan.unmatched,
                "No matching unit for line items, stock not restored"
            );
        }
        info!(
            order_id = %order.order_id,
            deleted_by = log.deleted_by,
            restored_units = plan.updates.len(),
            "Pending order released"
        );
        Ok(CleanupOutcome::Cleaned {
            order_id: order.order_id,
            restorations: plan.restorations,
            deleted_line_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_tag_the_deletion_log() {
        let webhook = CleanupTrigger::Webhook {
            payment_key: Some("pk".to_string()),
            payment_status: PaymentStatus::Aborted,
        };
        assert_eq!(webhook.deleted_by(), "payment_webhook_handler");
        assert_eq!(webhook.reason(), "payment ABORTED (webhook)");
        assert_eq!(
            webhook.webhook_payment(),
            (Some("pk".to_string()), Some("ABORTED".to_string()))
        );

        let client = CleanupTrigger::Client {
            user_id: "user-1".to_string(),
            reason: None,
        };
        assert_eq!(client.deleted_by(), "payment_failure_function");
        assert_eq!(client.reason(), "payment failed");
        assert_eq!(client.webhook_payment(), (None, None));

        let sweep = CleanupTrigger::Sweep {
            stale_after_minutes: 30,
        };
        assert_eq!(sweep.deleted_by(), "stale_order_sweeper");
        assert_eq!(sweep.reason(), "pending for more than 30 minutes");
    }

    #[test]
    fn client_reason_is_kept() {
        let client = CleanupTrigger::Client {
            user_id: "user-1".to_string(),
            reason: Some("card declined".to_string()),
        };
        assert_eq!(client.reason(), "card declined");
    }

    #[test]
    fn cleanup_errors_map_to_service_errors() {
        let denied: ServiceError = CleanupError::PermissionDenied {
            order_id: "order-1".to_string(),
        }
        .into();
        assert_eq!(denied.status(), gonggoo_sdk::objects::ErrorStatus::PermissionDenied);

        let db: ServiceError = CleanupError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(db.status(), gonggoo_sdk::objects::ErrorStatus::Internal);
        assert_eq!(db.public_message(), "internal error");
    }

    mod with_database {
        use super::*;
        use crate::entities::OrderStatus;
        use crate::testing::*;

        async fn seed_pending_order(pool: &PgPool) -> i64 {
            seed_user(pool, "user-1", &["order-1"]).await;
            let unit = seed_unit(pool, "p1", Some("u1"), "1kg", 5).await;
            SeedOrder {
                order_id: "order-1",
                user_id: "user-1",
                status: OrderStatus::Pending,
                total_amount: 10000,
                payment_key: Some("pk"),
                age_minutes: 45,
            }
            .insert(pool)
            .await;
            seed_line_item(pool, "order-1", "p1", Some("u1"), Some("1kg"), 2).await;
            unit
        }

        fn sweep() -> CleanupOrder {
            CleanupOrder {
                locator: OrderLocator::OrderId("order-1".to_string()),
                trigger: CleanupTrigger::Sweep {
                    stale_after_minutes: 30,
                },
            }
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn release_restores_stock_exactly_once(pool: PgPool) {
            let unit = seed_pending_order(&pool).await;
            let cleanup = FailureCleanupProcessor::new(pool.clone());

            let (restorations, deleted_line_items) = match cleanup.process(sweep()).await.unwrap() {
                CleanupOutcome::Cleaned {
                    restorations,
                    deleted_line_items,
                    ..
                } => (restorations, deleted_line_items),
                other => panic!("expected cleaned, got {other:?}"),
            };
            assert_eq!(deleted_line_items, 1);
            assert_eq!(restorations.len(), 1);
            assert_eq!((restorations[0].stock_before, restorations[0].stock_after), (5, 7));
            assert_eq!(unit_stock(&pool, unit).await, 7);
            assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Cancelled, true));
            assert_eq!(rows_for_order(&pool, "ordered_products", "order-1").await, 0);
            assert_eq!(rows_for_order(&pool, "order_deletion_logs", "order-1").await, 1);
            let order_ids = sqlx::query_scalar::<_, Vec<String>>(
                "SELECT order_ids FROM users WHERE user_id = 'user-1'",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            assert!(order_ids.is_empty());

            let second = cleanup.process(sweep()).await.unwrap();
            assert_eq!(
                second,
                CleanupOutcome::Skipped {
                    order_id: Some("order-1".to_string()),
                    reason: CleanupSkip::AlreadyDeleted,
                }
            );
            assert_eq!(unit_stock(&pool, unit).await, 7);
            assert_eq!(rows_for_order(&pool, "order_deletion_logs", "order-1").await, 1);
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn done_payment_row_keeps_order_and_stock(pool: PgPool) {
            let unit = seed_pending_order(&pool).await;
            seed_payment(&pool, "pk", Some("order-1"), Some("user-1"), "DONE").await;
            let cleanup = FailureCleanupProcessor::new(pool.clone());

            let outcome = cleanup.process(sweep()).await.unwrap();
            assert_eq!(
                outcome,
                CleanupOutcome::Skipped {
                    order_id: Some("order-1".to_string()),
                    reason: CleanupSkip::PaymentCompleted,
                }
            );
            assert_eq!(unit_stock(&pool, unit).await, 5);
            assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Pending, false));
            assert_eq!(rows_for_order(&pool, "ordered_products", "order-1").await, 1);
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn done_payment_found_by_key_when_order_id_missing(pool: PgPool) {
            let unit = seed_pending_order(&pool).await;
            seed_payment(&pool, "pk", None, None, "DONE").await;
            let cleanup = FailureCleanupProcessor::new(pool.clone());

            let outcome = cleanup
                .process(CleanupOrder {
                    locator: OrderLocator::PaymentKey("pk".to_string()),
                    trigger: CleanupTrigger::Webhook {
                        payment_key: Some("pk".to_string()),
                        payment_status: PaymentStatus::Aborted,
                    },
                })
                .await
                .unwrap();
            assert!(matches!(
                outcome,
                CleanupOutcome::Skipped {
                    reason: CleanupSkip::PaymentCompleted,
                    ..
                }
            ));
            assert_eq!(unit_stock(&pool, unit).await, 5);
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn client_cannot_release_another_users_order(pool: PgPool) {
            let unit = seed_pending_order(&pool).await;
            let cleanup = FailureCleanupProcessor::new(pool.clone());

            let err = cleanup
                .process(CleanupOrder {
                    locator: OrderLocator::OrderId("order-1".to_string()),
                    trigger: CleanupTrigger::Client {
                        user_id: "user-2".to_string(),
                        reason: None,
                    },
                })
                .await
                .unwrap_err();
            assert!(matches!(err, CleanupError::PermissionDenied { .. }));
            assert_eq!(unit_stock(&pool, unit).await, 5);
            assert_eq!(order_state(&pool, "order-1").await, (OrderStatus::Pending, false));
        }
    }
}
