use harvest_domain::{ChainId, RecordKind};

/// Identifies one store: a chain, a record kind and a target scope
/// (`module/call` or `address/<address>`).
///
/// The display form is also the backing table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub chain: ChainId,
    pub kind: RecordKind,
    pub scope: String,
}

impl StoreKey {
    pub fn for_call(chain: ChainId, kind: RecordKind, module: &str, call: &str) -> Self {
        Self {
            chain,
            kind,
            scope: format!("{}/{}", module.to_lowercase(), call.to_lowercase()),
        }
    }

    pub fn for_address(chain: ChainId, kind: RecordKind, address: &str) -> Self {
        Self {
            chain,
            kind,
            scope: format!("address/{address}"),
        }
    }

    pub fn table_name(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.chain, self.kind, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "HNZata7iMYWmk5RvZRTiAsSDhV8366zq2YGb3tLH5Upf74F";

    #[test]
    fn call_scope_is_case_insensitive() {
        let chain = ChainId::from("polkadot");
        let kind = RecordKind::Extrinsic;
        let a = StoreKey::for_call(chain.clone(), kind, "Balances", "transfer_keep_alive");
        let b = StoreKey::for_call(chain, kind, "balances", "TRANSFER_KEEP_ALIVE");

        assert_eq!(a, b);
        assert_eq!(a.table_name(), "polkadot/extrinsic/balances/transfer_keep_alive");
    }

    #[test]
    fn address_scope_keeps_address_verbatim() {
        let key = StoreKey::for_address(ChainId::from("kusama"), RecordKind::Transfer, ADDRESS);
        assert_eq!(key.table_name(), format!("kusama/transfer/address/{ADDRESS}"));
    }
}
