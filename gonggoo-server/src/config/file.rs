//! TOML file configuration structures.
//!
//! These structs directly map to the `gonggoo-config.toml` file format.

use serde::Deserialize;
use std::net::SocketAddr;
use url::Url;

/// Environment variable that overrides `[gateway] secret_key`.
pub const GATEWAY_SECRET_ENV: &str = "GONGGOO_GATEWAY_SECRET_KEY";
/// Environment variable that overrides `[auth] session_secret`.
pub const SESSION_SECRET_ENV: &str = "GONGGOO_SESSION_SECRET";

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Payment gateway API root.
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Gateway secret key. May be left empty and supplied through
    /// `GONGGOO_GATEWAY_SECRET_KEY` instead.
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            secret_key: String::new(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the auth service signs session tokens with.
    #[serde(default)]
    pub session_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_half_hour")]
    pub interval_secs: u64,
    #[serde(default = "default_half_hour")]
    pub stale_after_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_half_hour(),
            stale_after_secs: default_half_hour(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_half_hour() -> u64 {
    30 * 60
}

fn default_batch_size() -> i64 {
    100
}

fn default_concurrency() -> usize {
    8
}

impl FileConfig {
    /// Replace secrets with values from the environment where set.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(GATEWAY_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.gateway.secret_key = secret;
        }
        if let Some(secret) = lookup(SESSION_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.auth.session_secret = secret;
        }
    }
}
