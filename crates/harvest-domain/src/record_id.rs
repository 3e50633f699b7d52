use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordIdParseError {
    #[error("Invalid record id format: {0}")]
    Format(String),
    #[error("Invalid block number in record id: {0}")]
    BlockNumber(String),
    #[error("Invalid ordinal in record id: {0}")]
    Ordinal(String),
}

/// Explorer record identifier in `"{block}-{ordinal}"` form (e.g. `"14238250-2"`).
///
/// Ordering is numeric: by block number first, then by ordinal, so
/// `"99-5" < "100-1"` even though the strings compare the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId {
    block_number: u64,
    ordinal: u32,
}

impl RecordId {
    pub fn new(block_number: u64, ordinal: u32) -> Self {
        Self {
            block_number,
            ordinal,
        }
    }

    /// Ordering key used for sector partitioning.
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.block_number, self.ordinal)
    }
}

impl FromStr for RecordId {
    type Err = RecordIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (block, ordinal) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| RecordIdParseError::Format(s.to_string()))?;

        let block_number = block
            .parse()
            .map_err(|_| RecordIdParseError::BlockNumber(s.to_string()))?;
        let ordinal = ordinal
            .parse()
            .map_err(|_| RecordIdParseError::Ordinal(s.to_string()))?;

        Ok(Self {
            block_number,
            ordinal,
        })
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.to_string()
    }
}
