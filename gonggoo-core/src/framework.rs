use sqlx::PgPool;

/// Runs single-statement queries against the pool.
///
/// Multi-statement operations open their own `sqlx::Transaction` and call the
/// `*_tx` helpers on the entity types instead.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub type PgTransaction<'c> = sqlx::Transaction<'c, sqlx::Postgres>;
