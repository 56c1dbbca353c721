use kanau::processor::Processor;
use serde::Serialize;
use time::OffsetDateTime;

use crate::entities::OrderStatus;
use crate::framework::{DatabaseProcessor, PgTransaction};

const ORDER_COLUMNS: &str = r#"
    order_id, user_id, status, total_amount, payment_key, payment_status,
    payment_confirmed_at, cancel_reason, cancel_amount, cancelled_at,
    payment_cancel_data, refund_history, last_refunded_at, is_deleted,
    deleted_at, created_at, updated_at
"#;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_key: Option<String>,
    pub payment_status: Option<String>,
    pub payment_confirmed_at: Option<OffsetDateTime>,
    pub cancel_reason: Option<String>,
    pub cancel_amount: Option<i64>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub payment_cancel_data: Option<serde_json::Value>,
    pub refund_history: serde_json::Value,
    pub last_refunded_at: Option<OffsetDateTime>,
    pub is_deleted: bool,
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields written when an order is cancelled by a gateway refund.
#[derive(Debug, Clone)]
pub struct OrderCancellation<'a> {
    pub cancel_reason: &'a str,
    pub cancel_amount: i64,
    pub gateway_result: &'a serde_json::Value,
}

impl OrderRecord {
    /// Read and row-lock an order inside a transaction.
    pub async fn lock_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 FOR UPDATE");
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move a pending order to `confirmed`.
    ///
    /// Returns false when the order was no longer pending.
    pub async fn confirm_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        payment_key: &str,
        payment_status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'confirmed',
                payment_key = $2,
                payment_status = $3,
                payment_confirmed_at = now(),
                updated_at = now()
            WHERE order_id = $1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(payment_key)
        .bind(payment_status)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_cancelled_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        cancellation: &OrderCancellation<'_>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled',
                cancel_reason = $2,
                cancel_amount = $3,
                cancelled_at = now(),
                payment_cancel_data = $4,
                updated_at = now()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(cancellation.cancel_reason)
        .bind(cancellation.cancel_amount)
        .bind(cancellation.gateway_result)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Append one partial-refund entry to the order's refund history.
    pub async fn append_refund_history_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        entry: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE orders
            SET refund_history = refund_history || jsonb_build_array($2::jsonb),
                last_refunded_at = now(),
                updated_at = now()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(entry)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Soft-delete a released pending order.
    pub async fn soft_delete_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled',
                is_deleted = TRUE,
                deleted_at = now(),
                updated_at = now()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderById {
    pub order_id: String,
}

impl Processor<GetOrderById> for DatabaseProcessor {
    type Output = Option<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<OrderRecord>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(query.order_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Most recent order carrying the given payment key.
#[derive(Debug, Clone)]
pub struct GetOrderByPaymentKey {
    pub payment_key: String,
}

impl Processor<GetOrderByPaymentKey> for DatabaseProcessor {
    type Output = Option<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByPaymentKey")]
    async fn process(
        &self,
        query: GetOrderByPaymentKey,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_key = $1 ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(query.payment_key)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Ids of pending, non-deleted orders created before `created_before`, oldest first.
#[derive(Debug, Clone)]
pub struct ListStalePendingOrders {
    pub created_before: OffsetDateTime,
    pub limit: i64,
}

impl Processor<ListStalePendingOrders> for DatabaseProcessor {
    type Output = Vec<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListStalePendingOrders")]
    async fn process(&self, query: ListStalePendingOrders) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT order_id FROM orders
            WHERE status = 'pending' AND is_deleted = FALSE AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(query.created_before)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}
