mod config;
mod error;
mod harvester;
mod hydrator;
mod logger;
mod pagination;
mod provider;
mod targets;
#[cfg(test)]
mod testing;

use std::{process::ExitCode, sync::Arc};

pub use config::ConfigError;
pub use error::{HarvestError, Result};
pub use harvester::{HarvestReport, Harvester};
use harvest_client::QueryClient;
use harvest_sector_store::SectorStoreManager;
pub use hydrator::{HydrationConfig, Hydrator, IndexReport};
pub use pagination::{
    CursorDeducer, CursorProtocol, ElementProcessor, ListRequest, PageIterator,
    PageNumberProtocol, PageProtocol, StopReason, WalkProgress, WalkSummary,
};
pub use provider::{ProviderAdapter, ProviderKind, Subscan, SubscanVersion};
pub use targets::{
    ElementFilter, FieldFilter, FilterRule, NoFilter, ScrapeTarget, Selector, TargetConfig,
};
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;

use crate::config::{CliArgs, Config};

pub async fn run() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = config::parse_cli_args();
    let config = match config::initialize_configuration(&args) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    logger::initialize(&config.logger, &config.telemetry);

    tracing::info!(
        chain = %config.chain,
        provider = ?config.provider,
        base_url = %config.client.base_url,
        database = %config.database_path.display(),
        targets = config.targets.len(),
        "Starting chain-harvest v{}",
        env!("CARGO_PKG_VERSION")
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match harvest(config, &args, cancel).await {
        Ok(report) if report.failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) if error.is_cancelled() => {
            tracing::warn!("Harvest interrupted; stores were flushed");
            ExitCode::FAILURE
        }
        Err(error) => {
            tracing::error!(error = %error, "Harvest failed");
            ExitCode::FAILURE
        }
    }
}

async fn harvest(
    config: Config,
    args: &CliArgs,
    cancel: CancellationToken,
) -> Result<HarvestReport> {
    let client = Arc::new(QueryClient::new(&config.client)?);
    let stores = SectorStoreManager::connect(&config.database_path, &config.store).await?;
    let hydrator = Hydrator::new(
        config.chain.clone(),
        client,
        config.provider.adapter(),
        config.hydration.clone(),
        cancel.clone(),
    );
    let harvester = Harvester::new(config.chain.clone(), hydrator, stores, cancel);

    if args.hydrate_all {
        harvester.hydrate_all(&config.targets).await
    } else {
        harvester.run(&config.targets).await
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let mut sigterm = match tokio::signal::unix::signal(SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(error) => {
            tracing::warn!(error = %error, "Failed to install SIGTERM handler");
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, stopping"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, stopping"),
    }
    cancel.cancel();
}
