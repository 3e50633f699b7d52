use harvest_domain::{ChainId, Record, RecordId, RecordKind, RecordState};
use serde_json::{Map, Value, json};

use super::ProviderAdapter;
use crate::{
    error::{HarvestError, Result},
    pagination::{CursorProtocol, PageNumberProtocol, PageProtocol},
    targets::{ScrapeTarget, Selector},
};

/// Subscan API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscanVersion {
    /// `api/scan/*` list endpoints, paged by page number
    V1,
    /// `api/v2/scan/*` list endpoints, paged by `after_id`
    V2,
}

/// Adapter for the Subscan explorer family.
#[derive(Debug, Clone)]
pub struct Subscan {
    version: SubscanVersion,
}

impl Subscan {
    pub fn new(version: SubscanVersion) -> Self {
        Self { version }
    }
}

impl ProviderAdapter for Subscan {
    fn name(&self) -> &'static str {
        match self.version {
            SubscanVersion::V1 => "subscan_v1",
            SubscanVersion::V2 => "subscan_v2",
        }
    }

    fn list_endpoint(&self, kind: RecordKind) -> &'static str {
        match (self.version, kind) {
            (SubscanVersion::V1, RecordKind::Extrinsic) => "api/scan/extrinsics",
            (SubscanVersion::V1, RecordKind::Event) => "api/scan/events",
            (SubscanVersion::V1, RecordKind::Transfer) => "api/scan/transfers",
            (SubscanVersion::V2, RecordKind::Extrinsic) => "api/v2/scan/extrinsics",
            (SubscanVersion::V2, RecordKind::Event) => "api/v2/scan/events",
            (SubscanVersion::V2, RecordKind::Transfer) => "api/v2/scan/transfers",
        }
    }

    fn detail_endpoint(&self, kind: RecordKind) -> Option<&'static str> {
        match kind {
            RecordKind::Extrinsic => Some("api/scan/extrinsic"),
            RecordKind::Event => Some("api/scan/event"),
            RecordKind::Transfer => None,
        }
    }

    fn list_request(&self, target: &ScrapeTarget) -> Map<String, Value> {
        let mut body = Map::new();
        match &target.selector {
            Selector::Call { module, call } => {
                body.insert("module".to_string(), json!(module));
                let name_field = match target.kind {
                    RecordKind::Event => "event_id",
                    _ => "call",
                };
                body.insert(name_field.to_string(), json!(call));
            }
            Selector::Address { address } => {
                body.insert("address".to_string(), json!(address));
            }
        }
        body.extend(target.params.clone());
        body
    }

    fn detail_request(&self, kind: RecordKind, id: RecordId) -> Value {
        match kind {
            RecordKind::Event => json!({ "event_index": id.to_string() }),
            _ => json!({ "extrinsic_index": id.to_string() }),
        }
    }

    fn element_id(&self, kind: RecordKind, raw: &Value) -> Result<RecordId> {
        match kind {
            RecordKind::Extrinsic => parse_id(raw, "extrinsic_index"),
            RecordKind::Event => parse_id(raw, "event_index"),
            RecordKind::Transfer => {
                let block = raw.get("block_num").and_then(Value::as_u64);
                let event_idx = raw.get("event_idx").and_then(Value::as_u64);
                match (block, event_idx) {
                    (Some(block), Some(event_idx)) => {
                        let ordinal = u32::try_from(event_idx).map_err(|_| {
                            HarvestError::protocol(format!("event_idx out of range: {event_idx}"))
                        })?;
                        Ok(RecordId::new(block, ordinal))
                    }
                    _ => parse_id(raw, "extrinsic_index"),
                }
            }
        }
    }

    fn page_protocol(&self, kind: RecordKind, page_size: u32) -> Box<dyn PageProtocol> {
        match self.version {
            SubscanVersion::V1 => Box::new(PageNumberProtocol::new(page_size)),
            SubscanVersion::V2 => Box::new(CursorProtocol::new(
                page_size,
                Box::new(move |last: &Value| next_cursor(kind, last)),
            )),
        }
    }

    fn to_record(
        &self,
        chain: &ChainId,
        kind: RecordKind,
        raw: Value,
        state: RecordState,
    ) -> Result<Record> {
        let id = self.element_id(kind, &raw)?;
        let Value::Object(payload) = raw else {
            return Err(HarvestError::protocol(format!("{kind} {id} is not an object")));
        };

        let (module_field, name_field) = match kind {
            RecordKind::Extrinsic => ("call_module", "call_module_function"),
            RecordKind::Event => ("module_id", "event_id"),
            RecordKind::Transfer => ("module", "event_id"),
        };
        let module = text(&payload, module_field);
        let name = match (kind, text(&payload, name_field)) {
            (RecordKind::Transfer, name) if name.is_empty() => "transfer".to_string(),
            (_, name) => name,
        };

        Ok(Record::index(chain.clone(), kind, id, module, name)
            .with_payload(payload)
            .with_state(state))
    }
}

fn parse_id(raw: &Value, field: &str) -> Result<RecordId> {
    let value = raw
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HarvestError::protocol(format!("element has no `{field}`: {raw}")))?;
    value
        .parse()
        .map_err(|error| HarvestError::protocol(format!("bad `{field}`: {error}")))
}

fn next_cursor(kind: RecordKind, last: &Value) -> Result<Value> {
    match kind {
        RecordKind::Transfer => {
            let block = last.get("block_num").and_then(Value::as_u64);
            let event_idx = last.get("event_idx").and_then(Value::as_u64);
            match (block, event_idx) {
                (Some(block), Some(event_idx)) => Ok(json!([block, event_idx])),
                _ => Err(HarvestError::protocol(format!(
                    "transfer has no `block_num`/`event_idx` to page after: {last}"
                ))),
            }
        }
        _ => last
            .get("id")
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| {
                HarvestError::protocol(format!("{kind} has no `id` to page after: {last}"))
            }),
    }
}

fn text(payload: &Map<String, Value>, field: &str) -> String {
    payload
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
