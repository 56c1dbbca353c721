//! Runtime configuration re-exports.
//!
//! The validated config types are defined in `gonggoo_core::config`.

pub use gonggoo_core::config::{
    AuthConfig, ConfigStore, DEFAULT_GATEWAY_BASE_URL, GatewayConfig, ServerConfig, SharedConfig,
    SweeperConfig,
};
