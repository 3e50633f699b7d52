use std::{collections::BTreeMap, sync::Arc};

use harvest_domain::{Record, RecordId};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{Result, SectorKey, StoreError};

/// Sector key → JSON-encoded `BTreeMap<RecordId, Record>`.
type PartitionDef<'a> = TableDefinition<'a, &'static str, &'static [u8]>;

pub(crate) type SectorRecords = BTreeMap<RecordId, Record>;

/// Handle on the redb table backing one store.
///
/// Each row is a whole sector. Rows are replaced inside a single write
/// transaction, so a crash mid-flush leaves the previous image in place.
#[derive(Clone)]
pub(crate) struct PartitionTable {
    db: Arc<Database>,
    name: Arc<str>,
    concurrency_limiter: Arc<Semaphore>,
}

impl PartitionTable {
    pub(crate) fn new(db: Arc<Database>, name: &str, concurrency_limiter: Arc<Semaphore>) -> Self {
        Self {
            db,
            name: Arc::from(name),
            concurrency_limiter,
        }
    }

    fn definition(&self) -> PartitionDef<'_> {
        TableDefinition::new(&*self.name)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Create the table if it does not exist yet.
    pub(crate) fn ensure_blocking(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _table = write_txn.open_table(self.definition())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub(crate) fn load_blocking(&self, sector: &SectorKey) -> Result<Option<SectorRecords>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.definition())?;

        match table.get(sector.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn store_blocking(&self, sector: &SectorKey, encoded: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.definition())?;
            table.insert(sector.as_str(), encoded)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub(crate) fn sector_keys_blocking(&self) -> Result<Vec<SectorKey>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.definition())?;
        let mut keys = Vec::new();

        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(SectorKey::from(key.value().to_string()));
        }

        Ok(keys)
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.concurrency_limiter)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::SemaphoreClosed)
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&PartitionTable) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let table = self.clone();
        let permit = self.acquire_permit().await?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f(&table)
        })
        .await?
    }

    pub(crate) async fn ensure(&self) -> Result<()> {
        self.run_blocking(|table| table.ensure_blocking()).await
    }

    pub(crate) async fn load(&self, sector: SectorKey) -> Result<Option<SectorRecords>> {
        self.run_blocking(move |table| table.load_blocking(&sector))
            .await
    }

    pub(crate) async fn store(&self, sector: SectorKey, encoded: Vec<u8>) -> Result<()> {
        self.run_blocking(move |table| table.store_blocking(&sector, &encoded))
            .await
    }

    pub(crate) async fn sector_keys(&self) -> Result<Vec<SectorKey>> {
        self.run_blocking(|table| table.sector_keys_blocking())
            .await
    }
}
