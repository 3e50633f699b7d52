use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{ClientConfig, Result};

/// Status and body of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Wire seam under [`crate::QueryClient`].
///
/// Implementations send one POST and report what came back without
/// retrying or inspecting the body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging/metrics
    fn name(&self) -> &'static str;

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse>;
}

/// reqwest-backed transport for explorer APIs.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_in_flight.max(1))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout())
            .build()?;

        let api_key = config
            .api_key
            .clone()
            .filter(|_| config.has_api_key());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-API-Key", api_key);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
