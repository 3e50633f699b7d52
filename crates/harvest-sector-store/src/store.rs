use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use harvest_domain::{Record, RecordId};
use harvest_observability as observability;
use tokio::sync::Mutex;

use crate::{
    RecordIter, Result, SectorKey, SectorStoreConfig, StoreError, StoreKey,
    partition::{PartitionTable, SectorRecords},
    sector::Sector,
};

/// Deduplicating, sector-partitioned record store for one [`StoreKey`].
///
/// At most one sector is resident. Touching a record in another sector
/// flushes the resident one (if dirty) before the other is loaded or created,
/// so memory stays bounded by one sector.
///
/// Handles are cheap to clone and share the resident sector.
#[derive(Clone)]
pub struct SectorStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    key: StoreKey,
    table: PartitionTable,
    config: SectorStoreConfig,
    resident: Mutex<Option<Sector>>,
    flushes: AtomicU64,
}

impl SectorStore {
    pub(crate) fn new(key: StoreKey, table: PartitionTable, config: SectorStoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                key,
                table,
                config,
                resident: Mutex::new(None),
                flushes: AtomicU64::new(0),
            }),
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.inner.key
    }

    pub fn sector_key(&self, id: &RecordId) -> SectorKey {
        SectorKey::for_block(
            id.block_number(),
            self.inner.config.sector_digits,
            self.inner.config.sector_filler,
        )
    }

    /// Number of partition writes performed through this handle.
    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.load(Ordering::Relaxed)
    }

    /// Number of records in the resident sector.
    pub async fn resident_len(&self) -> usize {
        self.inner
            .resident
            .lock()
            .await
            .as_ref()
            .map_or(0, |sector| sector.records.len())
    }

    /// Index-phase write: store `record` unless its id is already present.
    ///
    /// Returns `true` when the record was new.
    pub async fn write(&self, record: Record) -> Result<bool> {
        self.check_owner(&record)?;

        let mut resident = self.inner.resident.lock().await;
        let sector = self.enter(&mut resident, record.id).await?;
        if sector.records.contains_key(&record.id) {
            return Ok(false);
        }

        sector.records.insert(record.id, record);
        sector.dirty = true;
        Ok(true)
    }

    /// Hydration write: store `record`, replacing any existing entry.
    pub async fn put(&self, record: Record) -> Result<()> {
        self.check_owner(&record)?;

        let mut resident = self.inner.resident.lock().await;
        let sector = self.enter(&mut resident, record.id).await?;
        sector.records.insert(record.id, record);
        sector.dirty = true;
        Ok(())
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let mut resident = self.inner.resident.lock().await;
        let sector = self.enter(&mut resident, id).await?;
        Ok(sector.records.get(&id).cloned())
    }

    /// Persist the resident sector if it has unsaved writes.
    pub async fn flush(&self) -> Result<()> {
        let mut resident = self.inner.resident.lock().await;
        self.flush_resident(&mut resident).await
    }

    /// Flush, then list all partitions and walk their records lazily.
    ///
    /// Each call re-lists the partitions, so a new iterator sees records
    /// written since the previous one.
    pub async fn iterate(&self) -> Result<RecordIter> {
        self.flush().await?;
        let sectors = self.inner.table.sector_keys().await?;
        Ok(RecordIter::new(self.inner.table.clone(), sectors))
    }

    /// All persisted ids in ascending order.
    pub async fn ids(&self) -> Result<Vec<RecordId>> {
        let iter = self.iterate().await?;
        let mut ids = tokio::task::spawn_blocking(move || {
            iter.map(|entry| entry.map(|(id, _)| id))
                .collect::<Result<Vec<_>>>()
        })
        .await??;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Run `f` with this store and flush afterwards, whether `f` succeeded or not.
    ///
    /// An error from `f` wins over a flush error; the flush error is logged.
    pub async fn scoped<F, Fut, T, E>(self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(SectorStore) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<StoreError>,
    {
        let result = f(self.clone()).await;
        let flushed = self.flush().await;

        match (result, flushed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(error)) => Err(error.into()),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(flush_error)) => {
                tracing::error!(
                    store = %self.inner.key,
                    error = %flush_error,
                    "Failed to flush sector after aborted operation"
                );
                Err(error)
            }
        }
    }

    fn check_owner(&self, record: &Record) -> Result<()> {
        let key = &self.inner.key;
        if record.chain != key.chain || record.kind != key.kind {
            return Err(StoreError::ForeignRecord {
                id: record.id,
                record: format!("{}/{}", record.chain, record.kind),
                store: key.to_string(),
            });
        }
        Ok(())
    }

    /// Make the sector holding `id` resident and return it.
    async fn enter<'a>(
        &self,
        resident: &'a mut Option<Sector>,
        id: RecordId,
    ) -> Result<&'a mut Sector> {
        let target = self.sector_key(&id);
        let is_resident = resident.as_ref().is_some_and(|sector| sector.key == target);

        if !is_resident {
            self.flush_resident(resident).await?;

            let loaded = self.inner.table.load(target.clone()).await?;
            observability::record_sector_load(self.inner.table.name(), loaded.is_some());
            tracing::trace!(
                store = %self.inner.key,
                sector = %target,
                found = loaded.is_some(),
                "Sector loaded"
            );
            *resident = Some(Sector::new(target.clone(), loaded.unwrap_or_default()));
        }

        Ok(resident.get_or_insert_with(|| Sector::new(target, SectorRecords::new())))
    }

    async fn flush_resident(&self, resident: &mut Option<Sector>) -> Result<()> {
        let Some(sector) = resident.as_mut() else {
            return Ok(());
        };
        if !sector.dirty {
            return Ok(());
        }

        let started = Instant::now();
        let encoded = serde_json::to_vec(&sector.records)?;
        self.inner.table.store(sector.key.clone(), encoded).await?;
        sector.dirty = false;

        self.inner.flushes.fetch_add(1, Ordering::Relaxed);
        observability::record_sector_flush(
            self.inner.table.name(),
            sector.records.len(),
            started.elapsed(),
        );
        tracing::debug!(
            store = %self.inner.key,
            sector = %sector.key,
            records = sector.records.len(),
            "Sector flushed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use harvest_domain::{RecordKind, RecordState};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::SectorStoreManager;

    async fn manager(temp_dir: &TempDir) -> SectorStoreManager {
        SectorStoreManager::connect(
            temp_dir.path().join("sectors.redb"),
            &SectorStoreConfig::default(),
        )
        .await
        .unwrap()
    }

    fn key() -> StoreKey {
        StoreKey::for_call("polkadot".into(), RecordKind::Extrinsic, "balances", "transfer")
    }

    fn stub(id: &str) -> Record {
        Record::index(
            "polkadot".into(),
            RecordKind::Extrinsic,
            id.parse().unwrap(),
            "balances",
            "transfer",
        )
    }

    #[tokio::test]
    async fn index_writes_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        assert!(store.write(stub("14238250-2")).await.unwrap());
        assert_eq!(store.resident_len().await, 1);

        assert!(!store.write(stub("14238250-2")).await.unwrap());
        assert_eq!(store.resident_len().await, 1);
    }

    #[tokio::test]
    async fn index_write_never_overwrites_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        let mut full = stub("100-1").with_state(RecordState::Hydrated);
        full.payload.insert("fee".to_string(), json!(500));
        store.put(full.clone()).await.unwrap();

        assert!(!store.write(stub("100-1")).await.unwrap());
        assert_eq!(store.get("100-1".parse().unwrap()).await.unwrap(), Some(full));
    }

    #[tokio::test]
    async fn sector_rollover_flushes_before_swapping() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;
        let store = manager.open(key()).await.unwrap();

        store.write(stub("1234-1")).await.unwrap();
        store.write(stub("9999-2")).await.unwrap();
        store.write(stub("1234-3")).await.unwrap();
        assert_eq!(store.flush_count(), 2);

        store.flush().await.unwrap();

        let fresh = manager.open(key()).await.unwrap();
        let low = fresh
            .inner
            .table
            .load(SectorKey::from("1234".to_string()))
            .await
            .unwrap()
            .unwrap();
        let high = fresh
            .inner
            .table
            .load(SectorKey::from("9999".to_string()))
            .await
            .unwrap()
            .unwrap();

        let low_ids: Vec<String> = low.keys().map(ToString::to_string).collect();
        let high_ids: Vec<String> = high.keys().map(ToString::to_string).collect();
        assert_eq!(low_ids, vec!["1234-1", "1234-3"]);
        assert_eq!(high_ids, vec!["9999-2"]);
    }

    #[tokio::test]
    async fn flush_is_noop_when_clean() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        store.flush().await.unwrap();
        assert_eq!(store.flush_count(), 0);

        store.write(stub("10-1")).await.unwrap();
        store.flush().await.unwrap();
        store.flush().await.unwrap();
        assert_eq!(store.flush_count(), 1);

        // A duplicate write does not dirty the sector.
        store.write(stub("10-1")).await.unwrap();
        store.flush().await.unwrap();
        assert_eq!(store.flush_count(), 1);
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        store.write(stub("100-1")).await.unwrap();

        let mut hydrated = stub("100-1").with_state(RecordState::Hydrated);
        hydrated.payload.insert("success".to_string(), json!(true));
        store.put(hydrated.clone()).await.unwrap();

        assert_eq!(
            store.get("100-1".parse().unwrap()).await.unwrap(),
            Some(hydrated)
        );
    }

    #[tokio::test]
    async fn iterate_is_restartable_and_covers_all_sectors() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        store.write(stub("14238250-1")).await.unwrap();
        store.write(stub("14238251-3")).await.unwrap();
        store.write(stub("15000000-1")).await.unwrap();

        let first: Vec<RecordId> = store
            .iterate()
            .await
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(first.len(), 3);

        store.write(stub("16000000-4")).await.unwrap();

        let mut second: Vec<String> = store
            .iterate()
            .await
            .unwrap()
            .map(|entry| entry.unwrap().0.to_string())
            .collect();
        second.sort();
        assert_eq!(
            second,
            vec!["14238250-1", "14238251-3", "15000000-1", "16000000-4"]
        );
    }

    #[tokio::test]
    async fn ids_are_sorted_numerically() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        for id in ["123456-2", "99-1", "123456-10", "5000-1"] {
            store.write(stub(id)).await.unwrap();
        }

        let ids: Vec<String> = store
            .ids()
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["99-1", "5000-1", "123456-2", "123456-10"]);
    }

    #[tokio::test]
    async fn rejects_records_from_other_stores() {
        let temp_dir = TempDir::new().unwrap();
        let store = manager(&temp_dir).await.open(key()).await.unwrap();

        let event = Record::index(
            "polkadot".into(),
            RecordKind::Event,
            "1-1".parse().unwrap(),
            "balances",
            "Transfer",
        );
        assert!(matches!(
            store.write(event).await,
            Err(StoreError::ForeignRecord { .. })
        ));
    }

    #[tokio::test]
    async fn scoped_flushes_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;
        let store = manager.open(key()).await.unwrap();

        let result: std::result::Result<(), StoreError> = store
            .clone()
            .scoped(|store| async move {
                store.write(stub("42-1")).await?;
                Err(StoreError::SemaphoreClosed)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.flush_count(), 1);

        let fresh = manager.open(key()).await.unwrap();
        assert!(fresh.get("42-1".parse().unwrap()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn records_survive_reopening_the_database() {
        let temp_dir = TempDir::new().unwrap();
        {
            let manager = manager(&temp_dir).await;
            let store = manager.open(key()).await.unwrap();
            store.write(stub("777-7")).await.unwrap();
            store.flush().await.unwrap();
        }

        let manager = manager(&temp_dir).await;
        let store = manager.open(key()).await.unwrap();
        assert!(!store.write(stub("777-7")).await.unwrap());
        assert_eq!(
            manager.store_names().await.unwrap(),
            vec![key().table_name()]
        );
    }
}
