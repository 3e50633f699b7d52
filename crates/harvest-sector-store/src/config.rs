use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SectorStoreConfig {
    /// Leading block-number digits kept in a sector key.
    pub sector_digits: usize,

    /// Character replacing every remaining digit of the block number.
    pub sector_filler: char,

    /// Maximum concurrent database operations.
    pub max_concurrent_operations: usize,
}

impl Default for SectorStoreConfig {
    fn default() -> Self {
        Self {
            sector_digits: 4,
            sector_filler: 'x',
            max_concurrent_operations: 16,
        }
    }
}
