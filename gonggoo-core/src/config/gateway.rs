//! Payment gateway credentials.

use std::time::Duration;
use url::Url;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.tosspayments.com";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GatewayConfig {
    /// Root of the gateway API; request paths are joined onto it.
    pub base_url: Url,
    /// Secret key sent as the HTTP basic-auth username.
    pub secret_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url.as_str())
            .field("secret_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secret() {
        let config = GatewayConfig {
            base_url: Url::parse(DEFAULT_GATEWAY_BASE_URL).unwrap(),
            secret_key: "test_sk_very_secret".to_string(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very_secret"));
        assert!(rendered.contains("api.tosspayments.com"));
    }
}
