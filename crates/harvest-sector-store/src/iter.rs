use std::collections::VecDeque;

use harvest_domain::{Record, RecordId};

use crate::{Result, SectorKey, partition::PartitionTable};

/// Lazy walk over every persisted record of a store.
///
/// Partitions are listed when the iterator is created and loaded one at a
/// time as it advances, in partition-key order. Records are ordered within a
/// sector but not across sectors of different magnitude; sort if you need a
/// global order. Loads are synchronous redb reads.
pub struct RecordIter {
    table: PartitionTable,
    pending: VecDeque<SectorKey>,
    current: std::collections::btree_map::IntoIter<RecordId, Record>,
}

impl RecordIter {
    pub(crate) fn new(table: PartitionTable, sectors: Vec<SectorKey>) -> Self {
        Self {
            table,
            pending: sectors.into(),
            current: Default::default(),
        }
    }
}

impl Iterator for RecordIter {
    type Item = Result<(RecordId, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(Ok(entry));
            }

            let sector = self.pending.pop_front()?;
            match self.table.load_blocking(&sector) {
                Ok(Some(records)) => self.current = records.into_iter(),
                Ok(None) => continue,
                Err(error) => return Some(Err(error)),
            }
        }
    }
}
