use serde::{Deserialize, Serialize};

/// Tracing output settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoggerConfig {
    /// `EnvFilter` directives, e.g. "chain_harvest=debug,harvest_client=trace"
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct TelemetryConfig {
    pub metrics: TelemetryMetricsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct TelemetryMetricsConfig {
    /// Serve Prometheus metrics over HTTP
    pub enabled: bool,
    pub bind_address: String,
}
