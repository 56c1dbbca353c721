//! StaleOrderSweeper processor.
//!
//! Pending orders whose checkout was abandoned never receive a webhook. The
//! sweeper periodically releases every pending order older than the
//! configured threshold through the shared cleanup rule and writes a
//! `cleanup_runs` row per pass.

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use kanau::processor::Processor;
use sqlx::PgPool;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::failure_cleanup::{
    CleanupOrder, CleanupOutcome, CleanupTrigger, FailureCleanupProcessor, OrderLocator,
};
use crate::config::{ConfigStore, SweeperConfig};
use crate::entities::cleanup_runs::{CleanupRunSummary, InsertCleanupRun};
use crate::entities::orders::ListStalePendingOrders;
use crate::framework::DatabaseProcessor;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Per-pass counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SweepTally {
    cleaned: i64,
    skipped: i64,
    failed: i64,
}

impl SweepTally {
    /// `None` is a cleanup that failed and was already logged.
    fn record(&mut self, outcome: &Option<CleanupOutcome>) {
        match outcome {
            Some(CleanupOutcome::Cleaned { .. }) => self.cleaned += 1,
            Some(CleanupOutcome::Skipped { .. }) => self.skipped += 1,
            None => self.failed += 1,
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub struct StaleOrderSweeper {
    db: DatabaseProcessor,
    cleanup: FailureCleanupProcessor,
    config: ConfigStore<SweeperConfig>,
    shutdown_rx: watch::Receiver<bool>,
}

impl StaleOrderSweeper {
    pub fn new(
        pool: PgPool,
        config: ConfigStore<SweeperConfig>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db: DatabaseProcessor::new(pool.clone()),
            cleanup: FailureCleanupProcessor::new(pool),
            config,
            shutdown_rx,
        }
    }

    fn ticker(config: &SweeperConfig) -> Interval {
        let period = config.interval.max(MIN_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run until shutdown. The first sweep happens one interval after start.
    pub async fn run(mut self) {
        info!("StaleOrderSweeper started");

        let mut watcher = self.config.subscribe();
        let mut config = self.config.snapshot().await;
        let mut ticker = Self::ticker(&config);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("StaleOrderSweeper received shutdown signal");
                        break;
                    }
                }

                changed = watcher.changed() => {
                    if changed.is_err() {
                        warn!("Sweeper config store dropped");
                        break;
                    }
                    config = self.config.snapshot().await;
                    ticker = Self::ticker(&config);
                    info!(?config, "Sweeper config reloaded");
                }

                _ = ticker.tick() => {
                    if !config.enabled {
                        debug!("Sweeper disabled, skipping pass");
                        continue;
                    }
                    match self.sweep_once(&config).await {
                        Ok(summary) => info!(
                            scanned = summary.scanned,
                            cleaned = summary.cleaned,
                            skipped = summary.skipped,
                            failed = summary.failed,
                            "Stale order sweep finished"
                        ),
                        Err(e) => error!(error = %e, "Stale order sweep failed"),
                    }
                }
            }
        }

        info!("StaleOrderSweeper shutdown complete");
    }

    /// Release one batch of stale pending orders and log the run.
    ///
    /// Each order is cleaned in its own transaction; a failing order is
    /// counted and does not stop the batch.
    #[tracing::instrument(skip_all, err, name = "SweepStaleOrders")]
    pub async fn sweep_once(&self, config: &SweeperConfig) -> Result<CleanupRunSummary, sqlx::Error> {
        let started_at = OffsetDateTime::now_utc();
        let created_before = time::Duration::try_from(config.stale_after)
            .ok()
            .and_then(|stale_after| started_at.checked_sub(stale_after))
            .unwrap_or(PrimitiveDateTime::MIN.assume_utc());

        let order_ids = self
            .db
            .process(ListStalePendingOrders {
                created_before,
                limit: config.batch_size,
            })
            .await?;
        let scanned = order_ids.len();

        let stale_after_minutes = config.stale_after.as_secs() / 60;
        let outcomes: Vec<Option<CleanupOutcome>> = stream::iter(order_ids)
            .map(|order_id| {
                self.cleanup.run_isolated(CleanupOrder {
                    locator: OrderLocator::OrderId(order_id),
                    trigger: CleanupTrigger::Sweep {
                        stale_after_minutes,
                    },
                })
            })
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;

        let mut tally = SweepTally::default();
        for outcome in &outcomes {
            tally.record(outcome);
        }

        let summary = CleanupRunSummary {
            run_id: Uuid::now_v7(),
            started_at,
            finished_at: OffsetDateTime::now_utc(),
            stale_after_secs: saturating_i64(config.stale_after.as_secs()),
            batch_size: config.batch_size,
            scanned: saturating_i64(scanned as u64),
            cleaned: tally.cleaned,
            skipped: tally.skipped,
            failed: tally.failed,
        };
        self.db.process(InsertCleanupRun(summary.clone())).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::CleanupSkip;

    #[test]
    fn tally_counts_each_outcome() {
        let mut tally = SweepTally::default();
        tally.record(&Some(CleanupOutcome::Cleaned {
            order_id: "a".to_string(),
            restorations: Vec::new(),
            deleted_line_items: 1,
        }));
        tally.record(&Some(CleanupOutcome::Skipped {
            order_id: Some("b".to_string()),
            reason: CleanupSkip::PaymentCompleted,
        }));
        tally.record(&None);
        tally.record(&None);
        assert_eq!(
            tally,
            SweepTally {
                cleaned: 1,
                skipped: 1,
                failed: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_waits_one_interval_and_clamps_zero() {
        let config = SweeperConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        let mut ticker = StaleOrderSweeper::ticker(&config);
        let start = Instant::now();
        ticker.tick().await;
        assert_eq!(start.elapsed(), MIN_INTERVAL);
    }

    mod with_database {
        use super::*;
        use crate::entities::OrderStatus;
        use crate::testing::*;

        fn sweeper(pool: PgPool) -> StaleOrderSweeper {
            let (_tx, shutdown_rx) = watch::channel(false);
            StaleOrderSweeper::new(pool, ConfigStore::new(SweeperConfig::default()), shutdown_rx)
        }

        async fn seed_stale_order(pool: &PgPool, order_id: &str, payment_key: &str, unit_id: &str) -> i64 {
            let unit = seed_unit(pool, "p1", Some(unit_id), unit_id, 5).await;
            SeedOrder {
                order_id,
                user_id: "user-1",
                status: OrderStatus::Pending,
                total_amount: 10000,
                payment_key: Some(payment_key),
                age_minutes: 45,
            }
            .insert(pool)
            .await;
            seed_line_item(pool, order_id, "p1", Some(unit_id), None, 2).await;
            unit
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn sweep_leaves_paid_pending_order_alone(pool: PgPool) {
            seed_user(&pool, "user-1", &["order-paid", "order-abandoned"]).await;
            let paid_unit = seed_stale_order(&pool, "order-paid", "pk-paid", "u1").await;
            seed_payment(&pool, "pk-paid", Some("order-paid"), Some("user-1"), "DONE").await;
            let abandoned_unit = seed_stale_order(&pool, "order-abandoned", "pk-abandoned", "u2").await;

            let summary = sweeper(pool.clone())
                .sweep_once(&SweeperConfig::default())
                .await
                .unwrap();
            assert_eq!(
                (summary.scanned, summary.cleaned, summary.skipped, summary.failed),
                (2, 1, 1, 0)
            );

            assert_eq!(unit_stock(&pool, paid_unit).await, 5);
            assert_eq!(order_state(&pool, "order-paid").await, (OrderStatus::Pending, false));
            assert_eq!(rows_for_order(&pool, "ordered_products", "order-paid").await, 1);

            assert_eq!(unit_stock(&pool, abandoned_unit).await, 7);
            assert_eq!(
                order_state(&pool, "order-abandoned").await,
                (OrderStatus::Cancelled, true)
            );

            let runs = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cleanup_runs")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(runs, 1);
        }

        #[sqlx::test(migrations = "../migrations")]
        async fn sweep_ignores_recent_pending_orders(pool: PgPool) {
            seed_user(&pool, "user-1", &["order-new"]).await;
            let unit = seed_unit(&pool, "p1", Some("u1"), "1kg", 5).await;
            SeedOrder {
                order_id: "order-new",
                user_id: "user-1",
                status: OrderStatus::Pending,
                total_amount: 10000,
                payment_key: None,
                age_minutes: 5,
            }
            .insert(&pool)
            .await;
            seed_line_item(&pool, "order-new", "p1", Some("u1"), None, 2).await;

            let summary = sweeper(pool.clone())
                .sweep_once(&SweeperConfig::default())
                .await
                .unwrap();
            assert_eq!(summary.scanned, 0);
            assert_eq!(unit_stock(&pool, unit).await, 5);
        }
    }
}
