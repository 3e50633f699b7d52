//! Scrape targets: what to harvest and how to filter it.
//!
//! A target names a record kind plus either a `(module, call)` pair or an
//! account address. Targets come from the `[[targets]]` tables of the config
//! file and are resolved into [`ScrapeTarget`] before any request is made.

mod config;
mod filter;

pub use config::{FilterRule, TargetConfig};
pub use filter::{ElementFilter, FieldFilter, NoFilter};
use harvest_domain::{ChainId, RecordKind};
use harvest_sector_store::StoreKey;
use serde_json::{Map, Value};

/// What a target enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Extrinsics of a call, or events of an event name, within a module
    Call { module: String, call: String },
    /// Transfers involving an account
    Address { address: String },
}

/// A resolved scrape target.
#[derive(Debug, Clone)]
pub struct ScrapeTarget {
    pub kind: RecordKind,
    pub selector: Selector,
    /// Merged into every list request body
    pub params: Map<String, Value>,
    pub auto_hydrate: bool,
    pub skip: bool,
    pub filter: FieldFilter,
}

impl ScrapeTarget {
    pub fn call(kind: RecordKind, module: &str, call: &str) -> Self {
        Self {
            kind,
            selector: Selector::Call {
                module: module.to_string(),
                call: call.to_string(),
            },
            params: Map::new(),
            auto_hydrate: false,
            skip: false,
            filter: FieldFilter::default(),
        }
    }

    pub fn address(address: &str) -> Self {
        Self {
            kind: RecordKind::Transfer,
            selector: Selector::Address {
                address: address.to_string(),
            },
            params: Map::new(),
            auto_hydrate: false,
            skip: false,
            filter: FieldFilter::default(),
        }
    }

    pub fn with_auto_hydrate(mut self, auto_hydrate: bool) -> Self {
        self.auto_hydrate = auto_hydrate;
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn store_key(&self, chain: &ChainId) -> StoreKey {
        match &self.selector {
            Selector::Call { module, call } => {
                StoreKey::for_call(chain.clone(), self.kind, module, call)
            }
            Selector::Address { address } => {
                StoreKey::for_address(chain.clone(), self.kind, address)
            }
        }
    }
}

impl std::fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.selector {
            Selector::Call { module, call } => write!(f, "{} {}.{}", self.kind, module, call),
            Selector::Address { address } => write!(f, "{} {}", self.kind, address),
        }
    }
}
