use kanau::processor::Processor;
use time::OffsetDateTime;

use crate::framework::{DatabaseProcessor, PgTransaction};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PaymentRecord {
    pub payment_key: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub status: String,
    pub total_amount: Option<i64>,
    pub gateway_response: serde_json::Value,
    pub refunds: serde_json::Value,
    pub webhook_data: Option<serde_json::Value>,
    pub fail_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub expired_at: Option<OffsetDateTime>,
    pub confirmed_at: Option<OffsetDateTime>,
    pub last_refunded_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

impl PaymentRecord {
    pub async fn lock_tx(
        tx: &mut PgTransaction<'_>,
        payment_key: &str,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_key, user_id, order_id, status, total_amount, gateway_response,
                   refunds, webhook_data, fail_reason, cancel_reason, expired_at,
                   confirmed_at, last_refunded_at, updated_at
            FROM payments
            WHERE payment_key = $1
            FOR UPDATE
            "#,
        )
        .bind(payment_key)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Row-lock every payment recorded for an order, matched by order id or by
    /// the payment key the order carries.
    pub async fn lock_for_order_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
        payment_key: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_key, user_id, order_id, status, total_amount, gateway_response,
                   refunds, webhook_data, fail_reason, cancel_reason, expired_at,
                   confirmed_at, last_refunded_at, updated_at
            FROM payments
            WHERE order_id = $1 OR payment_key = $2
            ORDER BY payment_key
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .bind(payment_key)
        .fetch_all(&mut **tx)
        .await
    }

    /// Store the post-refund gateway status and append to the refund history.
    pub async fn record_refund_tx(
        tx: &mut PgTransaction<'_>,
        payment_key: &str,
        status: &str,
        refund: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                refunds = refunds || jsonb_build_array($3::jsonb),
                last_refunded_at = now(),
                updated_at = now()
            WHERE payment_key = $1
            "#,
        )
        .bind(payment_key)
        .bind(status)
        .bind(refund)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetPaymentByKey {
    pub payment_key: String,
}

impl Processor<GetPaymentByKey> for DatabaseProcessor {
    type Output = Option<PaymentRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentByKey")]
    async fn process(&self, query: GetPaymentByKey) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_key, user_id, order_id, status, total_amount, gateway_response,
                   refunds, webhook_data, fail_reason, cancel_reason, expired_at,
                   confirmed_at, last_refunded_at, updated_at
            FROM payments
            WHERE payment_key = $1
            "#,
        )
        .bind(query.payment_key)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Record a successful confirmation, keyed by the gateway's payment key.
#[derive(Debug, Clone)]
pub struct UpsertConfirmedPayment {
    pub payment_key: String,
    pub user_id: String,
    pub order_id: String,
    pub status: String,
    pub total_amount: Option<i64>,
    pub gateway_response: serde_json::Value,
}

impl Processor<UpsertConfirmedPayment> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertConfirmedPayment")]
    async fn process(&self, query: UpsertConfirmedPayment) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (payment_key, user_id, order_id, status, total_amount, gateway_response, confirmed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (payment_key) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                order_id = EXCLUDED.order_id,
                status = EXCLUDED.status,
                total_amount = EXCLUDED.total_amount,
                gateway_response = EXCLUDED.gateway_response,
                confirmed_at = EXCLUDED.confirmed_at,
                updated_at = now()
            "#,
        )
        .bind(&query.payment_key)
        .bind(&query.user_id)
        .bind(&query.order_id)
        .bind(&query.status)
        .bind(query.total_amount)
        .bind(&query.gateway_response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Status-specific column carried by a gateway notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDetail {
    None,
    FailReason(String),
    CancelReason(String),
    ExpiredAt(OffsetDateTime),
}

/// Mirror a gateway-reported status onto the payment record.
///
/// Failure notifications can arrive for payments that were never confirmed,
/// so a missing row is created from the notification.
#[derive(Debug, Clone)]
pub struct MirrorPaymentStatus {
    pub payment_key: String,
    pub order_id: Option<String>,
    pub status: String,
    pub webhook_data: serde_json::Value,
    pub detail: StatusDetail,
}

impl Processor<MirrorPaymentStatus> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MirrorPaymentStatus")]
    async fn process(&self, query: MirrorPaymentStatus) -> Result<(), sqlx::Error> {
        let (fail_reason, cancel_reason, expired_at) = match query.detail {
            StatusDetail::None => (None, None, None),
            StatusDetail::FailReason(reason) => (Some(reason), None, None),
            StatusDetail::CancelReason(reason) => (None, Some(reason), None),
            StatusDetail::ExpiredAt(at) => (None, None, Some(at)),
        };
        sqlx::query(
            r#"
            INSERT INTO payments
                (payment_key, order_id, status, webhook_data, fail_reason, cancel_reason, expired_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            ON CONFLICT (payment_key) DO UPDATE
            SET status = EXCLUDED.status,
                order_id = COALESCE(payments.order_id, EXCLUDED.order_id),
                webhook_data = EXCLUDED.webhook_data,
                fail_reason = COALESCE(EXCLUDED.fail_reason, payments.fail_reason),
                cancel_reason = COALESCE(EXCLUDED.cancel_reason, payments.cancel_reason),
                expired_at = COALESCE(EXCLUDED.expired_at, payments.expired_at),
                updated_at = now()
            "#,
        )
        .bind(&query.payment_key)
        .bind(&query.order_id)
        .bind(&query.status)
        .bind(&query.webhook_data)
        .bind(fail_reason)
        .bind(cancel_reason)
        .bind(expired_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
