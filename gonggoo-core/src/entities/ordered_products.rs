use kanau::processor::Processor;
use serde::Serialize;

use crate::framework::{DatabaseProcessor, PgTransaction};

/// A line item of an order: which product unit, and how many.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedProduct {
    pub id: i64,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_id: Option<String>,
    pub unit_label: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub cart_item_id: Option<String>,
}

impl OrderedProduct {
    pub async fn list_for_order_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
    ) -> Result<Vec<OrderedProduct>, sqlx::Error> {
        sqlx::query_as::<_, OrderedProduct>(
            r#"
            SELECT id, order_id, product_id, product_name, unit_id, unit_label,
                   quantity, unit_price, cart_item_id
            FROM ordered_products
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn delete_for_order_tx(
        tx: &mut PgTransaction<'_>,
        order_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ordered_products WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Cart item ids referenced by an order's line items.
#[derive(Debug, Clone)]
pub struct GetOrderCartItemIds {
    pub order_id: String,
}

impl Processor<GetOrderCartItemIds> for DatabaseProcessor {
    type Output = Vec<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderCartItemIds")]
    async fn process(&self, query: GetOrderCartItemIds) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT cart_item_id FROM ordered_products
            WHERE order_id = $1 AND cart_item_id IS NOT NULL
            "#,
        )
        .bind(query.order_id)
        .fetch_all(&self.pool)
        .await
    }
}
