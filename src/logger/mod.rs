//! Tracing subscriber and metrics exporter setup.
//!
//! `RUST_LOG` overrides the configured filter when set.

mod config;

use std::net::SocketAddr;

pub(crate) use config::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) fn initialize(logger_config: &LoggerConfig, telemetry_config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logger_config.level));

    let registry = tracing_subscriber::registry().with(filter);
    let initialized = match logger_config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    if let Err(error) = initialized {
        eprintln!("Failed to install tracing subscriber: {error}");
    }

    initialize_metrics(&telemetry_config.metrics);
}

fn initialize_metrics(metrics_config: &TelemetryMetricsConfig) {
    if !metrics_config.enabled {
        return;
    }

    let bind_address: SocketAddr = match metrics_config.bind_address.parse() {
        Ok(address) => address,
        Err(error) => {
            tracing::warn!(
                bind_address = %metrics_config.bind_address,
                error = %error,
                "Invalid metrics bind address; metrics exporter disabled"
            );
            return;
        }
    };

    match PrometheusBuilder::new()
        .with_http_listener(bind_address)
        .install()
    {
        Ok(()) => tracing::info!(
            bind_address = %bind_address,
            "Prometheus metrics exporter enabled"
        ),
        Err(error) => tracing::warn!(
            bind_address = %bind_address,
            error = %error,
            "Failed to start Prometheus metrics exporter"
        ),
    }
}
