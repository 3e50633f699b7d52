use serde::{Deserialize, Serialize};

/// Kind of explorer record being harvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Extrinsic,
    Event,
    Transfer,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extrinsic => "extrinsic",
            Self::Event => "event",
            Self::Transfer => "transfer",
        }
    }

    /// JSON key holding the element array in a normalized list response.
    pub fn list_key(&self) -> &'static str {
        match self {
            Self::Extrinsic => "extrinsics",
            Self::Event => "events",
            Self::Transfer => "transfers",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
