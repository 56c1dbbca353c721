//! Row fixtures for the Postgres-backed tests.
//!
//! Each `#[sqlx::test]` gets a fresh database with the workspace migrations
//! applied, so fixtures insert exactly what a test needs and nothing else.

use sqlx::PgPool;

use crate::entities::OrderStatus;

pub(crate) async fn seed_user(pool: &PgPool, user_id: &str, order_ids: &[&str]) {
    let order_ids: Vec<String> = order_ids.iter().map(|id| id.to_string()).collect();
    sqlx::query("INSERT INTO users (user_id, order_ids) VALUES ($1, $2)")
        .bind(user_id)
        .bind(order_ids)
        .execute(pool)
        .await
        .unwrap();
}

/// Insert a unit (and its product, if new) and return the unit row id.
pub(crate) async fn seed_unit(
    pool: &PgPool,
    product_id: &str,
    unit_id: Option<&str>,
    label: &str,
    stock: i32,
) -> i64 {
    sqlx::query("INSERT INTO products (product_id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(product_id)
        .bind(format!("{product_id} name"))
        .execute(pool)
        .await
        .unwrap();
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO product_units (product_id, unit_id, label, stock)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(product_id)
    .bind(unit_id)
    .bind(label)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub(crate) struct SeedOrder<'a> {
    pub order_id: &'a str,
    pub user_id: &'a str,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_key: Option<&'a str>,
    pub age_minutes: i32,
}

impl SeedOrder<'_> {
    pub(crate) async fn insert(&self, pool: &PgPool) {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, status, total_amount, payment_key, created_at)
            VALUES ($1, $2, $3, $4, $5, now() - make_interval(mins => $6))
            "#,
        )
        .bind(self.order_id)
        .bind(self.user_id)
        .bind(self.status)
        .bind(self.total_amount)
        .bind(self.payment_key)
        .bind(self.age_minutes)
        .execute(pool)
        .await
        .unwrap();
    }
}

pub(crate) async fn seed_line_item(
    pool: &PgPool,
    order_id: &str,
    product_id: &str,
    unit_id: Option<&str>,
    unit_label: Option<&str>,
    quantity: i32,
) {
    sqlx::query(
        r#"
        INSERT INTO ordered_products
            (order_id, product_id, product_name, unit_id, unit_label, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6, 5000)
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(format!("{product_id} name"))
    .bind(unit_id)
    .bind(unit_label)
    .bind(quantity)
    .execute(pool)
    .await
    .unwrap();
}

pub(crate) async fn seed_payment(
    pool: &PgPool,
    payment_key: &str,
    order_id: Option<&str>,
    user_id: Option<&str>,
    status: &str,
) {
    sqlx::query(
        r#"
        INSERT INTO payments (payment_key, order_id, user_id, status, total_amount)
        VALUES ($1, $2, $3, $4, 10000)
        "#,
    )
    .bind(payment_key)
    .bind(order_id)
    .bind(user_id)
    .bind(status)
    .execute(pool)
    .await
    .unwrap();
}

pub(crate) async fn unit_stock(pool: &PgPool, unit_row_id: i64) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT stock FROM product_units WHERE id = $1")
        .bind(unit_row_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// `(status, is_deleted)` of an order.
pub(crate) async fn order_state(pool: &PgPool, order_id: &str) -> (OrderStatus, bool) {
    sqlx::query_as::<_, (OrderStatus, bool)>(
        "SELECT status, is_deleted FROM orders WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub(crate) async fn payment_status(pool: &PgPool, payment_key: &str) -> Option<String> {
    sqlx::query_scalar::<_, String>("SELECT status FROM payments WHERE payment_key = $1")
        .bind(payment_key)
        .fetch_optional(pool)
        .await
        .unwrap()
}

/// Row count of `table` for one order id.
pub(crate) async fn rows_for_order(pool: &PgPool, table: &str, order_id: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE order_id = $1");
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
