use serde::{Deserialize, Serialize};

use crate::pagination::DEFAULT_PAGE_SIZE;

/// Ids fetched per hydration batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HydrationConfig {
    /// Detail requests per batch; the store is flushed once per batch
    pub batch_size: usize,
    /// Elements requested per list page
    pub page_size: u32,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
