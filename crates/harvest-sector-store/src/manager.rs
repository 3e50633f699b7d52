use std::{path::Path, sync::Arc};

use redb::{Database, ReadableDatabase, TableHandle};
use tokio::sync::Semaphore;

use crate::{
    Result, SectorStore, SectorStoreConfig, StoreKey, partition::PartitionTable,
};

/// Sector Store Manager
///
/// Owns the redb database holding every store's partitions and hands out
/// [`SectorStore`] handles, one table per [`StoreKey`].
#[derive(Clone)]
pub struct SectorStoreManager {
    db: Arc<Database>,
    config: SectorStoreConfig,
    concurrency_limiter: Arc<Semaphore>,
}

impl SectorStoreManager {
    pub async fn connect(path: impl AsRef<Path>, config: &SectorStoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let db = Database::create(&path)?;
            let max_concurrent = config.max_concurrent_operations.max(1);
            if max_concurrent != config.max_concurrent_operations {
                tracing::warn!(
                    configured = config.max_concurrent_operations,
                    effective = max_concurrent,
                    "Sector store max_concurrent_operations too low; clamped"
                );
            }
            tracing::info!(
                path = %path.display(),
                max_concurrent,
                sector_digits = config.sector_digits,
                "Sector store opened"
            );

            Ok(Self {
                db: Arc::new(db),
                config,
                concurrency_limiter: Arc::new(Semaphore::new(max_concurrent)),
            })
        })
        .await?
    }

    /// Open the store for `key`, creating its table if needed.
    ///
    /// Every call returns an independent handle with no resident sector.
    pub async fn open(&self, key: StoreKey) -> Result<SectorStore> {
        let table = PartitionTable::new(
            Arc::clone(&self.db),
            &key.table_name(),
            Arc::clone(&self.concurrency_limiter),
        );
        table.ensure().await?;

        Ok(SectorStore::new(key, table, self.config.clone()))
    }

    /// Names of every store table in the database.
    pub async fn store_names(&self) -> Result<Vec<String>> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read()?;
            let names = read_txn
                .list_tables()?
                .map(|handle| handle.name().to_string())
                .collect();
            Ok(names)
        })
        .await?
    }
}
