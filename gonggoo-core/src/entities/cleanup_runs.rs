use kanau::processor::Processor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::framework::DatabaseProcessor;

/// Tally of one sweeper pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRunSummary {
    pub run_id: Uuid,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub stale_after_secs: i64,
    pub batch_size: i64,
    pub scanned: i64,
    pub cleaned: i64,
    pub skipped: i64,
    pub failed: i64,
}

#[derive(Debug, Clone)]
pub struct InsertCleanupRun(pub CleanupRunSummary);

impl Processor<InsertCleanupRun> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertCleanupRun")]
    async fn process(&self, query: InsertCleanupRun) -> Result<(), sqlx::Error> {
        let run = query.0;
        sqlx::query(
            r#"
            INSERT INTO cleanup_runs
                (run_id, started_at, finished_at, stale_after_secs, batch_size,
                 scanned, cleaned, skipped, failed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(run.run_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.stale_after_secs)
        .bind(run.batch_size)
        .bind(run.scanned)
        .bind(run.cleaned)
        .bind(run.skipped)
        .bind(run.failed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
