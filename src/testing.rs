//! In-memory explorer used by the engine tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use harvest_client::{ClientConfig, QueryClient, RawResponse, Transport};
use harvest_domain::{ChainId, RecordKind};
use harvest_sector_store::{SectorStore, SectorStoreConfig, SectorStoreManager, StoreKey};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Serves scripted list pages in order and detail payloads by id.
///
/// Once the scripted pages run out every list request gets `null` data.
#[derive(Default)]
pub(crate) struct FakeExplorer {
    pages: Mutex<VecDeque<Value>>,
    details: HashMap<String, Value>,
    failing: HashSet<String>,
    list_requests: Mutex<Vec<Value>>,
    detail_requests: Mutex<Vec<String>>,
    served: AtomicUsize,
    cancel_on: Option<(usize, CancellationToken)>,
}

impl FakeExplorer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(self, count: u64, list_key: &str, elements: Vec<Value>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(json!({ "count": count, list_key: elements }));
        self
    }

    pub(crate) fn with_detail(mut self, id: &str, data: Value) -> Self {
        self.details.insert(id.to_string(), data);
        self
    }

    /// Detail requests for `id` get an HTTP 500.
    pub(crate) fn failing_detail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Cancel `token` while serving the `nth` request (1-based), which is
    /// still answered normally.
    pub(crate) fn cancel_on_request(mut self, nth: usize, token: CancellationToken) -> Self {
        self.cancel_on = Some((nth, token));
        self
    }

    pub(crate) fn list_requests(&self) -> Vec<Value> {
        self.list_requests.lock().unwrap().clone()
    }

    pub(crate) fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeExplorer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn post_json(&self, _path: &str, body: &Value) -> harvest_client::Result<RawResponse> {
        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((nth, token)) = &self.cancel_on
            && *nth == served
        {
            token.cancel();
        }

        let detail_id = ["extrinsic_index", "event_index"]
            .iter()
            .find_map(|field| body.get(*field))
            .filter(|_| body.get("row").is_none())
            .and_then(Value::as_str);

        let data = match detail_id {
            Some(id) => {
                self.detail_requests.lock().unwrap().push(id.to_string());
                if self.failing.contains(id) {
                    return Ok(RawResponse::new(500, "Internal Server Error"));
                }
                self.details.get(id).cloned().unwrap_or(Value::Null)
            }
            None => {
                self.list_requests.lock().unwrap().push(body.clone());
                self.pages.lock().unwrap().pop_front().unwrap_or(Value::Null)
            }
        };

        Ok(RawResponse::new(
            200,
            json!({ "code": 0, "message": "Success", "data": data }).to_string(),
        ))
    }
}

pub(crate) fn chain() -> ChainId {
    ChainId::from("polkadot")
}

pub(crate) fn client(explorer: &Arc<FakeExplorer>) -> Arc<QueryClient> {
    let config = ClientConfig {
        requests_per_second: 0,
        ..ClientConfig::default()
    };
    Arc::new(QueryClient::with_transport(
        Arc::clone(explorer) as Arc<dyn Transport>,
        &config,
    ))
}

pub(crate) async fn manager() -> (TempDir, SectorStoreManager) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harvest").join("sectors.redb");
    let manager = SectorStoreManager::connect(path, &SectorStoreConfig::default())
        .await
        .unwrap();
    (dir, manager)
}

pub(crate) async fn store(manager: &SectorStoreManager, kind: RecordKind) -> SectorStore {
    let key = StoreKey::for_call(chain(), kind, "balances", "transfer");
    manager.open(key).await.unwrap()
}
