use uuid::Uuid;

use crate::framework::PgTransaction;

/// Audit entry written whenever a pending order is released.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeletionLog {
    pub order_id: String,
    pub user_id: Option<String>,
    pub reason: String,
    pub payment_key: Option<String>,
    pub payment_status: Option<String>,
    pub original_order_data: serde_json::Value,
    pub stock_restorations: serde_json::Value,
    pub deleted_by: &'static str,
    pub webhook_triggered: bool,
}

impl NewDeletionLog {
    pub async fn insert_tx(&self, tx: &mut PgTransaction<'_>) -> Result<Uuid, sqlx::Error> {
        let log_id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO order_deletion_logs
                (log_id, order_id, user_id, reason, payment_key, payment_status,
                 original_order_data, stock_restorations, deleted_by, webhook_triggered)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log_id)
        .bind(&self.order_id)
        .bind(&self.user_id)
        .bind(&self.reason)
        .bind(&self.payment_key)
        .bind(&self.payment_status)
        .bind(&self.original_order_data)
        .bind(&self.stock_restorations)
        .bind(self.deleted_by)
        .bind(self.webhook_triggered)
        .execute(&mut **tx)
        .await?;
        Ok(log_id)
    }
}
