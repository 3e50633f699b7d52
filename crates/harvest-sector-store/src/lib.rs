mod config;
mod error;
mod iter;
mod manager;
mod partition;
mod sector;
mod store;
mod store_key;

pub use config::SectorStoreConfig;
pub use error::{Result, StoreError};
pub use iter::RecordIter;
pub use manager::SectorStoreManager;
pub use sector::SectorKey;
pub use store::SectorStore;
pub use store_key::StoreKey;
