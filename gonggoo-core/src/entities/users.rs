use kanau::processor::Processor;

use crate::framework::{DatabaseProcessor, PgTransaction};

pub struct User;

impl User {
    /// Row-lock the user; returns false when no such user exists.
    pub async fn lock_tx(tx: &mut PgTransaction<'_>, user_id: &str) -> Result<bool, sqlx::Error> {
        let found = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(found.is_some())
    }

    pub async fn remove_order_tx(
        tx: &mut PgTransaction<'_>,
        user_id: &str,
        order_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET order_ids = array_remove(order_ids, $2), updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// Soft-delete cart items that were purchased. Already-deleted items are left alone.
#[derive(Debug, Clone)]
pub struct SoftDeleteCartItems {
    pub user_id: String,
    pub cart_item_ids: Vec<String>,
    pub reason: String,
}

impl Processor<SoftDeleteCartItems> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SoftDeleteCartItems")]
    async fn process(&self, query: SoftDeleteCartItems) -> Result<u64, sqlx::Error> {
        if query.cart_item_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET is_deleted = TRUE, deleted_at = now(), deleted_reason = $3
            WHERE user_id = $1 AND cart_item_id = ANY($2) AND is_deleted = FALSE
            "#,
        )
        .bind(&query.user_id)
        .bind(&query.cart_item_ids)
        .bind(&query.reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
