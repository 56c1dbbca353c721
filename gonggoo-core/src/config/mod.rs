//! Validated runtime configuration.
//!
//! Parsing and validation of the TOML file lives in the server crate; these
//! types are what the processors consume.

mod auth;
mod config_store;
mod gateway;
mod server;
mod sweeper;

pub use auth::AuthConfig;
pub use config_store::{ConfigStore, ConfigWatcher};
pub use gateway::{DEFAULT_GATEWAY_BASE_URL, DEFAULT_GATEWAY_TIMEOUT, GatewayConfig};
pub use server::ServerConfig;
pub use sweeper::SweeperConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// The sweeper section is not here: it is held in a [`ConfigStore`] so the
/// background task can react to reloads.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub gateway: Arc<RwLock<GatewayConfig>>,
    pub auth: Arc<RwLock<AuthConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, gateway: GatewayConfig, auth: AuthConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            gateway: Arc::new(RwLock::new(gateway)),
            auth: Arc::new(RwLock::new(auth)),
        }
    }
}
