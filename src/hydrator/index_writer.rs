use async_trait::async_trait;
use harvest_domain::{ChainId, RecordId, RecordKind, RecordState};
use harvest_sector_store::SectorStore;
use serde_json::Value;

use crate::{error::Result, pagination::ElementProcessor, provider::ProviderAdapter};

/// Turns list elements into records and writes them through the store's
/// dedup guard.
pub(super) struct IndexWriter<'a> {
    chain: &'a ChainId,
    kind: RecordKind,
    provider: &'a dyn ProviderAdapter,
    store: &'a SectorStore,
    state: RecordState,
    seen: Vec<RecordId>,
}

impl<'a> IndexWriter<'a> {
    pub(super) fn new(
        chain: &'a ChainId,
        kind: RecordKind,
        provider: &'a dyn ProviderAdapter,
        store: &'a SectorStore,
    ) -> Self {
        // Kinds without a detail endpoint are complete as listed.
        let state = match provider.detail_endpoint(kind) {
            Some(_) => RecordState::Indexed,
            None => RecordState::Hydrated,
        };
        Self {
            chain,
            kind,
            provider,
            store,
            state,
            seen: Vec::new(),
        }
    }

    /// Every id handed to the writer, new or not, sorted and deduplicated.
    pub(super) fn into_ids(mut self) -> Vec<RecordId> {
        self.seen.sort_unstable();
        self.seen.dedup();
        self.seen
    }
}

#[async_trait]
impl ElementProcessor for IndexWriter<'_> {
    async fn process(&mut self, element: Value) -> Result<bool> {
        let record = self
            .provider
            .to_record(self.chain, self.kind, element, self.state)?;
        self.seen.push(record.id);
        Ok(self.store.write(record).await?)
    }
}
