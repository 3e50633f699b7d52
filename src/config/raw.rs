use std::path::PathBuf;

use harvest_client::ClientConfig;
use harvest_domain::ChainId;
use harvest_sector_store::SectorStoreConfig;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    hydrator::HydrationConfig,
    logger::{LoggerConfig, TelemetryConfig},
    provider::ProviderKind,
    targets::{ScrapeTarget, TargetConfig},
};

/// File name of the sector database inside `data_path`.
const SECTOR_DATABASE_FILE: &str = "sectors.redb";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigRaw {
    /// Chain name as used by the explorer (e.g. "polkadot")
    pub chain: String,
    pub provider: ProviderKind,
    /// Root directory for harvested data
    pub data_path: PathBuf,
    pub client: ClientConfig,
    pub store: SectorStoreConfig,
    pub hydration: HydrationConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub chain: ChainId,
    pub provider: ProviderKind,
    pub database_path: PathBuf,
    pub client: ClientConfig,
    pub store: SectorStoreConfig,
    pub hydration: HydrationConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
    pub targets: Vec<ScrapeTarget>,
}

impl ConfigRaw {
    pub(crate) fn resolve(self) -> Result<Config, ConfigError> {
        let chain = self.chain.trim().to_lowercase();
        if chain.is_empty() {
            return Err(ConfigError::InvalidConfig("`chain` must not be empty".to_string()));
        }

        let mut client = self.client;
        if client.base_url.trim().is_empty() {
            client.base_url = format!("https://{chain}.api.subscan.io");
        }

        if self.store.sector_digits == 0 {
            return Err(ConfigError::InvalidConfig(
                "`store.sector_digits` must be at least 1".to_string(),
            ));
        }

        let targets = self
            .targets
            .into_iter()
            .map(TargetConfig::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            chain: ChainId::from(chain),
            provider: self.provider,
            database_path: self.data_path.join(SECTOR_DATABASE_FILE),
            client,
            store: self.store,
            hydration: self.hydration,
            logger: self.logger,
            telemetry: self.telemetry,
            targets,
        })
    }
}
