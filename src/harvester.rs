//! Runs every configured target against one chain.

use harvest_domain::ChainId;
use harvest_sector_store::SectorStoreManager;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{HarvestError, Result},
    hydrator::{Hydrator, IndexReport},
    targets::ScrapeTarget,
};

/// Per-run target tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Drives the hydrator over a list of targets.
///
/// Each target gets its own store, opened scoped so its resident sector is
/// flushed however the target ends. A failed target is logged and the run
/// moves on; cancellation ends the run.
pub struct Harvester {
    chain: ChainId,
    hydrator: Hydrator,
    stores: SectorStoreManager,
    cancel: CancellationToken,
}

impl Harvester {
    pub fn new(
        chain: ChainId,
        hydrator: Hydrator,
        stores: SectorStoreManager,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            chain,
            hydrator,
            stores,
            cancel,
        }
    }

    /// Index every target, hydrating those with `auto_hydrate`.
    pub async fn run(&self, targets: &[ScrapeTarget]) -> Result<HarvestReport> {
        self.for_each_target(targets, "index", |target| self.index_target(target))
            .await
    }

    /// Re-fetch detail for every stored record of every target.
    pub async fn hydrate_all(&self, targets: &[ScrapeTarget]) -> Result<HarvestReport> {
        self.for_each_target(targets, "hydrate", |target| self.rehydrate_target(target))
            .await
    }

    async fn for_each_target<'a, F, Fut>(
        &self,
        targets: &'a [ScrapeTarget],
        phase: &'static str,
        mut run_target: F,
    ) -> Result<HarvestReport>
    where
        F: FnMut(&'a ScrapeTarget) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut report = HarvestReport::default();

        for target in targets {
            if self.cancel.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }
            if target.skip {
                tracing::info!(chain = %self.chain, target = %target, "Target skipped");
                report.skipped += 1;
                continue;
            }

            match run_target(target).await {
                Ok(()) => report.succeeded += 1,
                Err(error) if error.is_cancelled() => {
                    tracing::warn!(
                        chain = %self.chain,
                        target = %target,
                        phase,
                        "Harvest cancelled"
                    );
                    return Err(error);
                }
                Err(error) => {
                    tracing::error!(
                        chain = %self.chain,
                        target = %target,
                        phase,
                        error = %error,
                        "Target failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            chain = %self.chain,
            phase,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Harvest finished"
        );
        Ok(report)
    }

    async fn index_target(&self, target: &ScrapeTarget) -> Result<()> {
        let store = self.stores.open(target.store_key(&self.chain)).await?;
        let IndexReport { walk, ids, hydrated } = store
            .scoped(|store| async move { self.hydrator.fetch_index(target, &store).await })
            .await?;

        tracing::info!(
            chain = %self.chain,
            target = %target,
            examined = walk.examined,
            new = walk.new,
            filtered = walk.filtered,
            reported_total = walk.reported_total,
            listed = ids.len(),
            hydrated,
            stop = walk.stop.as_str(),
            "Target indexed"
        );
        Ok(())
    }

    async fn rehydrate_target(&self, target: &ScrapeTarget) -> Result<()> {
        let store = self.stores.open(target.store_key(&self.chain)).await?;
        let hydrated = store
            .scoped(|store| async move {
                let ids = store.ids().await?;
                self.hydrator
                    .fetch_full(target.kind, &ids, &store, true)
                    .await
            })
            .await?;

        tracing::info!(
            chain = %self.chain,
            target = %target,
            hydrated = hydrated.len(),
            "Target re-hydrated"
        );
        Ok(())
    }
}
