use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ChainId, RecordId, RecordKind};

/// Raised when a detail response is paired with the wrong stored record.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "Detail for {detail_chain}/{detail_kind}/{detail_id} cannot be merged into {chain}/{kind}/{id}"
)]
pub struct MergeIdentityError {
    pub chain: ChainId,
    pub kind: RecordKind,
    pub id: RecordId,
    pub detail_chain: ChainId,
    pub detail_kind: RecordKind,
    pub detail_id: RecordId,
}

/// How complete a stored record is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Identity stub produced by a list endpoint.
    #[default]
    Indexed,
    /// Payload fetched from the detail endpoint (or a list endpoint that is
    /// already complete).
    Hydrated,
}

/// Extrinsic, event or transfer as persisted by a sector store.
///
/// `chain`, `kind` and `id` are the identity and never change once the record
/// is created. Everything else in `payload` is whatever the provider returned
/// and is replaced field-by-field on hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub chain: ChainId,
    pub kind: RecordKind,
    pub id: RecordId,
    #[serde(default)]
    pub module: String,
    /// Call name for extrinsics, event name for events.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: RecordState,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// Create an index stub holding identity only.
    pub fn index(
        chain: ChainId,
        kind: RecordKind,
        id: RecordId,
        module: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            kind,
            id,
            module: module.into(),
            name: name.into(),
            state: RecordState::Indexed,
            payload: Map::new(),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.id.block_number()
    }

    pub fn is_hydrated(&self) -> bool {
        self.state == RecordState::Hydrated
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_state(mut self, state: RecordState) -> Self {
        self.state = state;
        self
    }

    /// Merge a detail record into this one.
    ///
    /// Every payload field in `detail` overwrites the stored value; fields
    /// only present here are kept. Module and name are taken from `detail`
    /// when it carries them.
    pub fn absorb(&mut self, detail: Record) -> Result<(), MergeIdentityError> {
        if self.chain != detail.chain || self.kind != detail.kind || self.id != detail.id {
            return Err(MergeIdentityError {
                chain: self.chain.clone(),
                kind: self.kind,
                id: self.id,
                detail_chain: detail.chain,
                detail_kind: detail.kind,
                detail_id: detail.id,
            });
        }

        if !detail.module.is_empty() {
            self.module = detail.module;
        }
        if !detail.name.is_empty() {
            self.name = detail.name;
        }
        self.payload.extend(detail.payload);
        self.state = RecordState::Hydrated;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn absorb_keeps_index_fields_and_adds_detail() {
        let id = RecordId::new(100, 1);
        let mut stored = Record::index("polkadot".into(), RecordKind::Extrinsic, id, "balances", "")
            .with_payload(payload(json!({ "block_num": 100, "success": false })));

        let detail = Record::index("polkadot".into(), RecordKind::Extrinsic, id, "", "transfer")
            .with_payload(payload(json!({ "fee": "500", "success": true })));

        stored.absorb(detail).unwrap();

        assert_eq!(stored.block_number(), 100);
        assert_eq!(stored.module, "balances");
        assert_eq!(stored.name, "transfer");
        assert_eq!(stored.payload["block_num"], json!(100));
        assert_eq!(stored.payload["fee"], json!("500"));
        assert_eq!(stored.payload["success"], json!(true));
        assert!(stored.is_hydrated());
    }

    #[test]
    fn absorb_rejects_identity_mismatch() {
        let mut stored = Record::index(
            "polkadot".into(),
            RecordKind::Event,
            RecordId::new(100, 1),
            "balances",
            "Transfer",
        );
        let detail = Record::index(
            "polkadot".into(),
            RecordKind::Event,
            RecordId::new(100, 2),
            "balances",
            "Transfer",
        );

        let err = stored.absorb(detail).unwrap_err();
        assert_eq!(err.id, RecordId::new(100, 1));
        assert_eq!(err.detail_id, RecordId::new(100, 2));
        assert!(!stored.is_hydrated());
    }

    #[test]
    fn absorb_rejects_other_chain() {
        let id = RecordId::new(7, 0);
        let kind = RecordKind::Extrinsic;
        let mut stored = Record::index("kusama".into(), kind, id, "system", "remark");
        let detail = Record::index("polkadot".into(), kind, id, "system", "remark");

        assert!(stored.absorb(detail).is_err());
    }
}
