//! Explorer provider adapters.
//!
//! An adapter knows the endpoints, request field names, element identity and
//! paging scheme of one explorer API. Everything above it works with
//! normalized pages and [`Record`]s.

mod subscan;

use std::sync::Arc;

use harvest_domain::{ChainId, Record, RecordId, RecordKind, RecordState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
pub use subscan::{Subscan, SubscanVersion};

use crate::{error::Result, pagination::PageProtocol, targets::ScrapeTarget};

/// Provider selected by the `provider` config key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    SubscanV1,
    SubscanV2,
}

impl ProviderKind {
    pub fn adapter(&self) -> Arc<dyn ProviderAdapter> {
        match self {
            Self::SubscanV1 => Arc::new(Subscan::new(SubscanVersion::V1)),
            Self::SubscanV2 => Arc::new(Subscan::new(SubscanVersion::V2)),
        }
    }
}

pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn list_endpoint(&self, kind: RecordKind) -> &'static str;

    /// `None` when list elements of `kind` are already complete.
    fn detail_endpoint(&self, kind: RecordKind) -> Option<&'static str>;

    /// JSON key of the element array in a list page.
    fn list_key(&self, kind: RecordKind) -> &'static str {
        kind.list_key()
    }

    /// Body template for list requests; paging fields are added per page.
    fn list_request(&self, target: &ScrapeTarget) -> Map<String, Value>;

    fn detail_request(&self, kind: RecordKind, id: RecordId) -> Value;

    fn element_id(&self, kind: RecordKind, raw: &Value) -> Result<RecordId>;

    fn page_protocol(&self, kind: RecordKind, page_size: u32) -> Box<dyn PageProtocol>;

    fn to_record(
        &self,
        chain: &ChainId,
        kind: RecordKind,
        raw: Value,
        state: RecordState,
    ) -> Result<Record>;
}
