use std::collections::BTreeMap;

use harvest_domain::{Record, RecordId};

/// Partition key covering a contiguous block range.
///
/// The first `digits` digits of the block number are kept and every
/// remaining digit is replaced by the filler: with 4 digits and `'x'`,
/// block 14238250 lands in `"1423xxxx"`, which covers 14230000..=14239999.
/// Block numbers with no more than `digits` digits are their own sector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorKey(String);

impl SectorKey {
    pub fn for_block(block_number: u64, digits: usize, filler: char) -> Self {
        let digits = digits.max(1);
        let block = block_number.to_string();
        if block.len() <= digits {
            return Self(block);
        }

        let mut key = String::with_capacity(block.len());
        key.push_str(&block[..digits]);
        key.extend(std::iter::repeat_n(filler, block.len() - digits));
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SectorKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SectorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resident partition of a store.
pub(crate) struct Sector {
    pub(crate) key: SectorKey,
    pub(crate) records: BTreeMap<RecordId, Record>,
    pub(crate) dirty: bool,
}

impl Sector {
    pub(crate) fn new(key: SectorKey, records: BTreeMap<RecordId, Record>) -> Self {
        Self {
            key,
            records,
            dirty: false,
        }
    }
}
