use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the explorer query client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Explorer API root (e.g. "https://polkadot.api.subscan.io"). Left empty, it is
    /// derived from the configured chain.
    pub base_url: String,

    /// API key sent as `X-API-Key`. Selects the higher request ceiling.
    pub api_key: Option<String>,

    /// Requests per second allowed without an API key
    pub requests_per_second: u32,

    /// Requests per second allowed with an API key
    pub requests_per_second_with_key: u32,

    /// Maximum requests in flight at once
    pub max_in_flight: usize,

    /// Wait after an HTTP 429 in milliseconds
    pub rate_limit_cooldown_ms: u64,

    /// Wait after a throttling message embedded in a 200 response in milliseconds
    pub soft_rate_limit_cooldown_ms: u64,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    /// Request ceiling for this configuration, chosen once by key presence.
    pub fn effective_requests_per_second(&self) -> u32 {
        if self.has_api_key() {
            self.requests_per_second_with_key
        } else {
            self.requests_per_second
        }
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn soft_rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.soft_rate_limit_cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            requests_per_second: 2,
            requests_per_second_with_key: 20,
            max_in_flight: 16,
            rate_limit_cooldown_ms: 1_000,
            soft_rate_limit_cooldown_ms: 30_000,
            request_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_follows_api_key_presence() {
        let mut config = ClientConfig::default();
        assert_eq!(config.effective_requests_per_second(), 2);

        config.api_key = Some("   ".to_string());
        assert_eq!(config.effective_requests_per_second(), 2);

        config.api_key = Some("secret".to_string());
        assert_eq!(config.effective_requests_per_second(), 20);
    }
}
