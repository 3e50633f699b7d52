//! Two-phase retrieval: enumerate index records, then hydrate them in batches.

mod config;
mod index_writer;

use std::{sync::Arc, time::Instant};

pub use config::HydrationConfig;
use futures::{StreamExt, stream::FuturesUnordered};
use harvest_client::QueryClient;
use harvest_domain::{ChainId, Record, RecordId, RecordKind, RecordState};
use harvest_observability as observability;
use harvest_sector_store::SectorStore;
use index_writer::IndexWriter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    error::{HarvestError, Result},
    pagination::{ListRequest, PageIterator, WalkSummary},
    provider::ProviderAdapter,
    targets::ScrapeTarget,
};

/// Outcome of [`Hydrator::fetch_index`].
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub walk: WalkSummary,
    /// Every id listed during the walk, sorted
    pub ids: Vec<RecordId>,
    /// Records hydrated by the chained detail phase
    pub hydrated: usize,
}

pub struct Hydrator {
    chain: ChainId,
    client: Arc<QueryClient>,
    provider: Arc<dyn ProviderAdapter>,
    config: HydrationConfig,
    cancel: CancellationToken,
}

impl Hydrator {
    pub fn new(
        chain: ChainId,
        client: Arc<QueryClient>,
        provider: Arc<dyn ProviderAdapter>,
        config: HydrationConfig,
        cancel: CancellationToken,
    ) -> Self {
        let batch_size = config.batch_size.max(1);
        if batch_size != config.batch_size {
            tracing::warn!(
                configured = config.batch_size,
                effective = batch_size,
                "Hydration batch_size too low; clamped"
            );
        }

        Self {
            chain,
            client,
            provider,
            config: HydrationConfig {
                batch_size,
                ..config
            },
            cancel,
        }
    }

    /// Walk the target's list endpoint and write each element through the
    /// store's dedup guard, then hydrate when the target asks for it.
    ///
    /// Hydration covers every listed id that is not yet hydrated, so a run
    /// interrupted between the two phases catches up on the next one.
    pub async fn fetch_index(
        &self,
        target: &ScrapeTarget,
        store: &SectorStore,
    ) -> Result<IndexReport> {
        let kind = target.kind;
        let request = ListRequest {
            chain: self.chain.clone(),
            kind,
            endpoint: self.provider.list_endpoint(kind),
            list_key: self.provider.list_key(kind),
            template: self.provider.list_request(target),
        };
        let mut protocol = self.provider.page_protocol(kind, self.config.page_size);
        let mut writer = IndexWriter::new(&self.chain, kind, self.provider.as_ref(), store);

        let walk = PageIterator::new(Arc::clone(&self.client), self.cancel.clone())
            .walk(&request, protocol.as_mut(), &target.filter, &mut writer)
            .await?;
        store.flush().await?;

        let ids = writer.into_ids();
        let hydrated = if target.auto_hydrate {
            self.fetch_full(kind, &ids, store, false).await?.len()
        } else {
            0
        };

        Ok(IndexReport {
            walk,
            ids,
            hydrated,
        })
    }

    /// Fetch detail for `ids` and merge it into the store.
    ///
    /// Without `update_existing`, ids whose stored record is already
    /// hydrated are skipped. Batches run one after another; within a batch
    /// requests are concurrent up to the client's in-flight limit. Each
    /// batch is flushed before the next starts, so on failure the returned
    /// [`HarvestError::Hydration`] reports how many ids are left and earlier
    /// batches stay persisted.
    pub async fn fetch_full(
        &self,
        kind: RecordKind,
        ids: &[RecordId],
        store: &SectorStore,
        update_existing: bool,
    ) -> Result<Vec<Record>> {
        let Some(endpoint) = self.provider.detail_endpoint(kind) else {
            tracing::debug!(
                provider = self.provider.name(),
                kind = %kind,
                "No detail endpoint; listed records are already complete"
            );
            return Ok(Vec::new());
        };

        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let pending = if update_existing {
            ids
        } else {
            let mut pending = Vec::with_capacity(ids.len());
            for id in ids {
                let hydrated = store
                    .get(id)
                    .await?
                    .is_some_and(|record| record.is_hydrated());
                if !hydrated {
                    pending.push(id);
                }
            }
            pending
        };

        let total = pending.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        tracing::info!(
            chain = %self.chain,
            kind = %kind,
            ids = total,
            batch_size = self.config.batch_size,
            update_existing,
            "Hydrating records"
        );

        let mut hydrated = Vec::with_capacity(total);
        for (index, batch) in pending.chunks(self.config.batch_size).enumerate() {
            match self.fetch_batch(kind, endpoint, index, batch, store).await {
                Ok(records) => hydrated.extend(records),
                Err(error) => {
                    let remaining = total - index * self.config.batch_size;
                    tracing::error!(
                        chain = %self.chain,
                        kind = %kind,
                        batch = index,
                        remaining,
                        error = %error,
                        "Hydration batch failed"
                    );
                    return Err(HarvestError::Hydration {
                        remaining,
                        source: Box::new(error),
                    });
                }
            }
        }

        Ok(hydrated)
    }

    #[instrument(
        name = "hydration_batch",
        skip(self, kind, endpoint, ids, store),
        fields(chain = %self.chain, kind = %kind, ids = ids.len())
    )]
    async fn fetch_batch(
        &self,
        kind: RecordKind,
        endpoint: &'static str,
        batch: usize,
        ids: &[RecordId],
        store: &SectorStore,
    ) -> Result<Vec<Record>> {
        let started = Instant::now();
        let result = self.fetch_and_merge(kind, endpoint, ids, store).await;
        let status = match &result {
            Ok(_) => "success",
            Err(error) if error.is_cancelled() => "cancelled",
            Err(_) => "failed",
        };
        observability::record_hydration_batch(
            self.chain.as_str(),
            kind.as_str(),
            status,
            ids.len(),
            started.elapsed(),
        );
        if result.is_ok() {
            tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Hydration batch flushed"
            );
        }
        result
    }

    async fn fetch_and_merge(
        &self,
        kind: RecordKind,
        endpoint: &'static str,
        ids: &[RecordId],
        store: &SectorStore,
    ) -> Result<Vec<Record>> {
        let mut requests: FuturesUnordered<_> = ids
            .iter()
            .map(|&id| self.fetch_detail(kind, endpoint, id))
            .collect();

        let mut responses = Vec::with_capacity(ids.len());
        while let Some(response) = requests.next().await {
            responses.push(response?);
        }
        drop(requests);

        // Responses that arrived after cancellation are discarded.
        if self.cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        // Nothing is written until every response of the batch has merged.
        responses.sort_unstable_by_key(|(id, _)| *id);
        let mut records = Vec::with_capacity(responses.len());
        for (id, data) in responses {
            if data.is_null() {
                return Err(HarvestError::protocol(format!("no detail returned for {kind} {id}")));
            }
            let detail = self
                .provider
                .to_record(&self.chain, kind, data, RecordState::Hydrated)?;

            let mut record = match store.get(id).await? {
                Some(existing) => existing,
                None => Record::index(self.chain.clone(), kind, id, "", ""),
            };
            record.absorb(detail)?;
            records.push(record);
        }

        if self.cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }
        for record in &records {
            store.put(record.clone()).await?;
        }
        store.flush().await?;

        Ok(records)
    }

    async fn fetch_detail(
        &self,
        kind: RecordKind,
        endpoint: &'static str,
        id: RecordId,
    ) -> Result<(RecordId, Value)> {
        let body = self.provider.detail_request(kind, id);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HarvestError::Cancelled),
            data = self.client.query(endpoint, &body) => Ok((id, data?)),
        }
    }
}
