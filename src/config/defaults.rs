//! Typed default configuration.
//!
//! Every key of [`ConfigRaw`] has a value here, so a config file only needs
//! the keys it changes (usually `chain` and `[[targets]]`).

use std::path::PathBuf;

use harvest_client::ClientConfig;
use harvest_sector_store::SectorStoreConfig;

use super::ConfigRaw;
use crate::{
    hydrator::HydrationConfig,
    logger::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig},
    provider::ProviderKind,
};

pub(crate) fn config() -> ConfigRaw {
    ConfigRaw {
        chain: "polkadot".to_string(),
        provider: ProviderKind::SubscanV1,
        data_path: PathBuf::from("data"),
        client: ClientConfig::default(),
        store: SectorStoreConfig::default(),
        hydration: HydrationConfig::default(),
        logger: LoggerConfig {
            level: "chain_harvest=info,harvest_client=info,harvest_sector_store=info".to_string(),
            format: LogFormat::Pretty,
        },
        telemetry: TelemetryConfig {
            metrics: TelemetryMetricsConfig {
                enabled: false,
                bind_address: "0.0.0.0:9464".to_string(),
            },
        },
        targets: Vec::new(),
    }
}
