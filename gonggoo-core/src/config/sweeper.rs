//! Stale pending order sweeper settings.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Time between sweeps.
    pub interval: Duration,
    /// A pending order older than this is considered abandoned.
    pub stale_after: Duration,
    /// Maximum orders examined per sweep.
    pub batch_size: i64,
    /// Maximum cleanups running at once within a sweep.
    pub concurrency: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30 * 60),
            stale_after: Duration::from_secs(30 * 60),
            batch_size: 100,
            concurrency: 8,
        }
    }
}
