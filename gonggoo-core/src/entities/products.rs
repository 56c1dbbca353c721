use crate::framework::PgTransaction;

/// One purchasable unit of a product and its stock counter.
///
/// `unit_id` is absent on legacy units, which are addressed by `label` only.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductUnit {
    pub id: i64,
    pub product_id: String,
    pub product_name: String,
    pub unit_id: Option<String>,
    pub label: String,
    pub stock: i32,
}

/// New absolute stock value for a unit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub unit_row_id: i64,
    pub new_stock: i32,
}

impl ProductUnit {
    /// Read and row-lock every unit of the given products.
    pub async fn lock_for_products_tx(
        tx: &mut PgTransaction<'_>,
        product_ids: &[String],
    ) -> Result<Vec<ProductUnit>, sqlx::Error> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ProductUnit>(
            r#"
            SELECT u.id, u.product_id, p.name AS product_name, u.unit_id, u.label, u.stock
            FROM product_units u
            JOIN products p ON p.product_id = u.product_id
            WHERE u.product_id = ANY($1)
            ORDER BY u.product_id, u.position, u.id
            FOR UPDATE OF u
            "#,
        )
        .bind(product_ids)
        .fetch_all(&mut **tx)
        .await
    }

    /// Write computed stock values in one statement. Rows must already be locked.
    pub async fn apply_stock_tx(
        tx: &mut PgTransaction<'_>,
        updates: &[StockUpdate],
    ) -> Result<u64, sqlx::Error> {
        if updates.is_empty() {
            return Ok(0);
        }
        let (ids, stocks): (Vec<i64>, Vec<i32>) = updates
            .iter()
            .map(|u| (u.unit_row_id, u.new_stock))
            .unzip();
        let result = sqlx::query(
            r#"
            UPDATE product_units AS u
            SET stock = v.stock, updated_at = now()
            FROM UNNEST($1::bigint[], $2::integer[]) AS v(id, stock)
            WHERE u.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&stocks)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
