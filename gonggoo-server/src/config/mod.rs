//! Configuration module for gonggoo-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    AuthConfig, DEFAULT_GATEWAY_BASE_URL, GatewayConfig, ServerConfig, SharedConfig,
    SweeperConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid gateway url: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub sweeper: SweeperConfig,
}

impl LoadedConfig {
    /// Split into the request-side shared config and the sweeper settings,
    /// which live in their own versioned store.
    pub fn into_shared(self) -> (SharedConfig, SweeperConfig) {
        (
            SharedConfig::new(self.server, self.gateway, self.auth),
            self.sweeper,
        )
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI and environment overrides, validate.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        file_config.apply_env_overrides(|name| std::env::var(name).ok());

        build_loaded_config(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.gateway.secret_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway.secret_key is empty".to_string(),
        ));
    }
    if config.auth.session_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.session_secret is empty".to_string(),
        ));
    }
    if config.gateway.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.timeout_secs must be positive".to_string(),
        ));
    }
    let sweeper = &config.sweeper;
    if sweeper.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sweeper.interval_secs must be positive".to_string(),
        ));
    }
    if sweeper.batch_size < 1 {
        return Err(ConfigError::ValidationError(
            "sweeper.batch_size must be at least 1".to_string(),
        ));
    }
    if sweeper.concurrency < 1 {
        return Err(ConfigError::ValidationError(
            "sweeper.concurrency must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    validate(&file_config)?;

    let base_url = match file_config.gateway.base_url {
        Some(url) => url,
        None => Url::parse(DEFAULT_GATEWAY_BASE_URL)?,
    };
    let sweeper = file_config.sweeper;

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        gateway: GatewayConfig {
            base_url,
            secret_key: file_config.gateway.secret_key,
            timeout: Duration::from_secs(file_config.gateway.timeout_secs),
        },
        auth: AuthConfig::new(file_config.auth.session_secret.into_bytes()),
        sweeper: SweeperConfig {
            enabled: sweeper.enabled,
            interval: Duration::from_secs(sweeper.interval_secs),
            stale_after: Duration::from_secs(sweeper.stale_after_secs),
            batch_size: sweeper.batch_size,
            concurrency: sweeper.concurrency,
        },
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
