use gonggoo_sdk::objects::{RefundReceiveAccount, RefundView};
use kanau::processor::Processor;
use serde::Serialize;
use time::OffsetDateTime;

use crate::framework::{DatabaseProcessor, PgTransaction};

pub const REFUND_STATUS_COMPLETED: &str = "COMPLETED";

/// Immutable record of one successful gateway refund.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    pub refund_id: String,
    pub payment_key: String,
    pub order_id: Option<String>,
    pub user_id: String,
    pub cancel_reason: String,
    pub cancel_amount: Option<i64>,
    pub refund_receive_account: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub refund_result: serde_json::Value,
    pub is_full_refund: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub refunded_at: OffsetDateTime,
    pub status: String,
}

impl RefundRecord {
    /// Id format is `{payment_key}_{unix millis}`.
    pub fn make_id(payment_key: &str, at: OffsetDateTime) -> String {
        let millis = at.unix_timestamp_nanos() / 1_000_000;
        format!("{payment_key}_{millis}")
    }

    pub async fn insert_tx(
        tx: &mut PgTransaction<'_>,
        record: &RefundRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO refunds
                (refund_id, payment_key, order_id, user_id, cancel_reason, cancel_amount,
                 refund_receive_account, idempotency_key, refund_result, is_full_refund,
                 refunded_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&record.refund_id)
        .bind(&record.payment_key)
        .bind(&record.order_id)
        .bind(&record.user_id)
        .bind(&record.cancel_reason)
        .bind(record.cancel_amount)
        .bind(&record.refund_receive_account)
        .bind(&record.idempotency_key)
        .bind(&record.refund_result)
        .bind(record.is_full_refund)
        .bind(record.refunded_at)
        .bind(&record.status)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub fn to_view(&self) -> RefundView {
        RefundView {
            id: self.refund_id.clone(),
            payment_key: self.payment_key.clone(),
            order_id: self.order_id.clone(),
            cancel_reason: self.cancel_reason.clone(),
            cancel_amount: self.cancel_amount,
            refund_receive_account: self
                .refund_receive_account
                .clone()
                .and_then(|v| serde_json::from_value::<RefundReceiveAccount>(v).ok()),
            idempotency_key: self.idempotency_key.clone(),
            refund_result: self.refund_result.clone(),
            is_full_refund: self.is_full_refund,
            refunded_at: (self.refunded_at.unix_timestamp_nanos() / 1_000_000) as i64,
            status: self.status.clone(),
        }
    }
}

/// A page of a user's refunds, newest first.
///
/// `start_after` is the id of the last refund on the previous page. Fetches
/// `limit + 1` rows so the caller can tell whether another page exists.
#[derive(Debug, Clone)]
pub struct ListUserRefunds {
    pub user_id: String,
    pub limit: i64,
    pub start_after: Option<String>,
}

impl Processor<ListUserRefunds> for DatabaseProcessor {
    type Output = Vec<RefundRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserRefunds")]
    async fn process(&self, query: ListUserRefunds) -> Result<Vec<RefundRecord>, sqlx::Error> {
        // An unknown cursor yields the first page.
        sqlx::query_as::<_, RefundRecord>(
            r#"
            WITH cursor AS (
                SELECT refunded_at, refund_id FROM refunds
                WHERE refund_id = $2 AND user_id = $1
            )
            SELECT r.refund_id, r.payment_key, r.order_id, r.user_id, r.cancel_reason,
                   r.cancel_amount, r.refund_receive_account, r.idempotency_key,
                   r.refund_result, r.is_full_refund, r.refunded_at, r.status
            FROM refunds r
            WHERE r.user_id = $1
              AND (
                NOT EXISTS (SELECT 1 FROM cursor)
                OR (r.refunded_at, r.refund_id) < (SELECT refunded_at, refund_id FROM cursor)
              )
            ORDER BY r.refunded_at DESC, r.refund_id DESC
            LIMIT $3
            "#,
        )
        .bind(&query.user_id)
        .bind(&query.start_after)
        .bind(query.limit + 1)
        .fetch_all(&self.pool)
        .await
    }
}
