use harvest_domain::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FieldFilter, ScrapeTarget, Selector};
use crate::config::ConfigError;

/// Skip elements whose `field` equals `equals`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilterRule {
    pub field: String,
    pub equals: Value,
}

/// One `[[targets]]` entry of the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub kind: RecordKind,
    pub module: Option<String>,
    /// Call name for extrinsics, event name for events
    pub call: Option<String>,
    /// Account for transfer targets
    pub address: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub auto_hydrate: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub filter: Vec<FilterRule>,
}

impl TargetConfig {
    pub(crate) fn resolve(self) -> Result<ScrapeTarget, ConfigError> {
        let selector = match (self.kind, self.module, self.call, self.address) {
            (RecordKind::Transfer, None, None, Some(address)) if !address.trim().is_empty() => {
                Selector::Address { address }
            }
            (RecordKind::Transfer, ..) => {
                return Err(ConfigError::InvalidConfig(
                    "transfer targets need `address` and no `module`/`call`".to_string(),
                ));
            }
            (_, Some(module), Some(call), None)
                if !module.trim().is_empty() && !call.trim().is_empty() =>
            {
                Selector::Call { module, call }
            }
            (kind, ..) => {
                return Err(ConfigError::InvalidConfig(format!(
                    "{kind} targets need `module` and `call` and no `address`"
                )));
            }
        };

        Ok(ScrapeTarget {
            kind: self.kind,
            selector,
            params: self.params,
            auto_hydrate: self.auto_hydrate,
            skip: self.skip,
            filter: FieldFilter::new(self.filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn target(kind: RecordKind) -> TargetConfig {
        TargetConfig {
            kind,
            module: None,
            call: None,
            address: None,
            params: Map::new(),
            auto_hydrate: false,
            skip: false,
            filter: Vec::new(),
        }
    }

    #[test]
    fn resolves_call_target() {
        let mut config = target(RecordKind::Extrinsic);
        config.module = Some("balances".to_string());
        config.call = Some("transfer_keep_alive".to_string());
        config.auto_hydrate = true;
        config.params.insert("success".to_string(), json!(true));

        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.selector,
            Selector::Call {
                module: "balances".to_string(),
                call: "transfer_keep_alive".to_string()
            }
        );
        assert!(resolved.auto_hydrate);
        assert_eq!(resolved.params["success"], json!(true));
    }

    #[test]
    fn resolves_address_target() {
        let mut config = target(RecordKind::Transfer);
        config.address = Some("14ShUZUYUR35RBZW6uVVt1zXDxmSQddkeDdXf1JkMA6P721N".to_string());

        assert!(matches!(
            config.resolve().unwrap().selector,
            Selector::Address { .. }
        ));
    }

    #[test]
    fn rejects_incomplete_targets() {
        let mut events = target(RecordKind::Event);
        events.module = Some("balances".to_string());
        assert!(events.resolve().is_err());

        let mut transfers = target(RecordKind::Transfer);
        transfers.module = Some("balances".to_string());
        transfers.address = Some("addr".to_string());
        assert!(transfers.resolve().is_err());

        assert!(target(RecordKind::Transfer).resolve().is_err());
    }
}
