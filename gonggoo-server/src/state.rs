//! Application state shared across all request handlers.

use crate::config::runtime::{ConfigStore, SharedConfig, SweeperConfig};
use gonggoo_core::gateway::TossGateway;
use gonggoo_core::processors::{FailureCleanupProcessor, PaymentProcessor, WebhookDispatcher};
use sqlx::PgPool;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Shared HTTP client for gateway calls.
    pub http: reqwest::Client,
    /// Request-side configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Sweeper settings; the sweeper task watches this store.
    pub sweeper_config: ConfigStore<SweeperConfig>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        http: reqwest::Client,
        config: SharedConfig,
        sweeper_config: ConfigStore<SweeperConfig>,
    ) -> Self {
        Self {
            db,
            http,
            config,
            sweeper_config,
        }
    }

    /// Payment processor bound to the gateway config as of this call.
    pub async fn payment_processor(&self) -> PaymentProcessor {
        let gateway = TossGateway::new(self.http.clone(), &*self.config.gateway.read().await);
        PaymentProcessor::new(self.db.clone(), gateway)
    }

    pub fn cleanup_processor(&self) -> FailureCleanupProcessor {
        FailureCleanupProcessor::new(self.db.clone())
    }

    pub fn webhook_dispatcher(&self) -> WebhookDispatcher {
        WebhookDispatcher::new(self.db.clone())
    }
}
