use harvest_domain::RecordId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Semaphore closed")]
    SemaphoreClosed,

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Record chain or kind does not match the store it was written to
    #[error("Record {id} ({record}) does not belong to store {store}")]
    ForeignRecord {
        id: RecordId,
        record: String,
        store: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
