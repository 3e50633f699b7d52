//! Sequential walk over a paged list endpoint.

mod page;
mod protocol;

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use harvest_client::QueryClient;
use harvest_domain::{ChainId, RecordKind};
use harvest_observability as observability;
use page::Page;
pub use protocol::{
    CursorDeducer, CursorProtocol, DEFAULT_PAGE_SIZE, PageNumberProtocol, PageProtocol,
    WalkProgress,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    error::{HarvestError, Result},
    targets::ElementFilter,
};

/// Receives every element the filter lets through.
#[async_trait]
pub trait ElementProcessor: Send {
    /// Returns `true` when the element was newly stored, `false` when it was
    /// already known.
    async fn process(&mut self, element: Value) -> Result<bool>;
}

/// One list enumeration.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub chain: ChainId,
    pub kind: RecordKind,
    pub endpoint: &'static str,
    pub list_key: &'static str,
    /// Merged into every page request
    pub template: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The provider reported a zero total or returned no elements
    Empty,
    /// New plus filtered elements reached the reported total
    CountReached,
    /// A page produced no new elements
    StalePage,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::CountReached => "count_reached",
            Self::StalePage => "stale_page",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Elements received across all pages, filtered ones included
    pub examined: u64,
    pub new: u64,
    pub filtered: u64,
    pub requests: u64,
    /// Total reported by the last page
    pub reported_total: u64,
    pub stop: StopReason,
}

/// Walks a list endpoint page by page.
///
/// Pages are strictly sequential: the next request is built only after every
/// element of the current page has been processed. The walk ends on the
/// first of: an empty page, the total count accounted for, or a page whose
/// processed elements were all already known.
///
/// The stale-page rule guards against providers whose page windows shift
/// between requests. It can stop early when a window happens to be entirely
/// known while older unseen elements remain further back.
pub struct PageIterator {
    client: Arc<QueryClient>,
    cancel: CancellationToken,
}

impl PageIterator {
    pub fn new(client: Arc<QueryClient>, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    #[instrument(
        name = "page_walk",
        skip_all,
        fields(
            chain = %request.chain,
            kind = %request.kind,
            protocol = protocol.name(),
            pages = tracing::field::Empty,
            new = tracing::field::Empty,
        )
    )]
    pub async fn walk(
        &self,
        request: &ListRequest,
        protocol: &mut dyn PageProtocol,
        filter: &dyn ElementFilter,
        processor: &mut dyn ElementProcessor,
    ) -> Result<WalkSummary> {
        let started = Instant::now();
        let mut examined = 0u64;
        let mut new = 0u64;
        let mut filtered = 0u64;
        let mut requests = 0u64;

        let (stop, reported_total) = loop {
            let body = protocol.build_next_request(&request.template);
            let data = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(HarvestError::Cancelled),
                data = self.client.query(request.endpoint, &body) => data?,
            };
            requests += 1;

            let page = Page::parse(data, request.list_key)?;
            let reported_total = page.count;
            let Some(last) = page.elements.last().cloned() else {
                break (StopReason::Empty, reported_total);
            };
            if reported_total == 0 {
                break (StopReason::Empty, reported_total);
            }

            let page_len = page.elements.len();
            let mut processed = 0usize;
            let mut page_new = 0usize;
            for element in page.elements {
                if filter.skip(&element) {
                    filtered += 1;
                    continue;
                }
                if self.cancel.is_cancelled() {
                    return Err(HarvestError::Cancelled);
                }
                processed += 1;
                if processor.process(element).await? {
                    page_new += 1;
                }
            }

            examined += page_len as u64;
            new += page_new as u64;
            observability::record_page(
                request.chain.as_str(),
                request.kind.as_str(),
                page_len,
                page_new,
            );
            tracing::debug!(
                request = requests,
                elements = page_len,
                new = page_new,
                reported_total,
                "Page processed"
            );

            if processed > 0 && page_new == 0 {
                break (StopReason::StalePage, reported_total);
            }

            let progress = WalkProgress {
                total: reported_total,
                accounted: new + filtered,
            };
            if protocol.is_done(&progress) {
                break (StopReason::CountReached, reported_total);
            }

            protocol.advance(&last)?;
        };

        let span = tracing::Span::current();
        span.record("pages", requests);
        span.record("new", new);
        observability::record_walk(
            request.chain.as_str(),
            request.kind.as_str(),
            stop.as_str(),
            requests as usize,
            started.elapsed(),
        );
        tracing::info!(
            examined,
            new,
            filtered,
            reported_total,
            stop = stop.as_str(),
            "Walk finished"
        );

        Ok(WalkSummary {
            examined,
            new,
            filtered,
            requests,
            reported_total,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::{
        targets::{FieldFilter, FilterRule, NoFilter},
        testing::{FakeExplorer, chain, client},
    };

    /// Remembers ids in memory the way a store would.
    #[derive(Default)]
    struct SeenIds {
        seen: HashSet<String>,
        order: Vec<String>,
    }

    #[async_trait]
    impl ElementProcessor for SeenIds {
        async fn process(&mut self, element: Value) -> Result<bool> {
            let id = element["extrinsic_index"].as_str().unwrap_or_default().to_string();
            self.order.push(id.clone());
            Ok(self.seen.insert(id))
        }
    }

    fn extrinsics(ids: &[&str]) -> Vec<Value> {
        ids.iter()
            .enumerate()
            .map(|(n, id)| json!({ "id": n + 1, "extrinsic_index": id, "success": true }))
            .collect()
    }

    fn request() -> ListRequest {
        let mut template = Map::new();
        template.insert("module".to_string(), json!("balances"));
        template.insert("call".to_string(), json!("transfer"));
        ListRequest {
            chain: chain(),
            kind: RecordKind::Extrinsic,
            endpoint: "api/scan/extrinsics",
            list_key: "extrinsics",
            template,
        }
    }

    fn iterator(explorer: &Arc<FakeExplorer>) -> PageIterator {
        PageIterator::new(client(explorer), CancellationToken::new())
    }

    #[tokio::test]
    async fn stops_when_count_is_reached() {
        let explorer = Arc::new(
            FakeExplorer::new()
                .with_page(5, "extrinsics", extrinsics(&["10-1", "10-2"]))
                .with_page(5, "extrinsics", extrinsics(&["9-1", "9-2"]))
                .with_page(5, "extrinsics", extrinsics(&["8-1"]))
                .with_page(5, "extrinsics", extrinsics(&["7-1"])),
        );
        let mut protocol = PageNumberProtocol::new(2);
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.examined, 5);
        assert_eq!(summary.new, 5);
        assert_eq!(summary.requests, 3);
        assert_eq!(summary.stop, StopReason::CountReached);

        let pages: Vec<_> = explorer
            .list_requests()
            .iter()
            .map(|body| body["page"].clone())
            .collect();
        assert_eq!(pages, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(explorer.list_requests()[0]["module"], json!("balances"));
    }

    #[tokio::test]
    async fn stale_page_ends_walk_before_count() {
        let explorer = Arc::new(
            FakeExplorer::new()
                .with_page(10, "extrinsics", extrinsics(&["10-1", "10-2"]))
                .with_page(10, "extrinsics", extrinsics(&["10-1", "10-2"]))
                .with_page(10, "extrinsics", extrinsics(&["9-1", "9-2"])),
        );
        let mut protocol = PageNumberProtocol::new(2);
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.stop, StopReason::StalePage);
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.examined, 4);
        assert_eq!(summary.new, 2);
    }

    #[tokio::test]
    async fn empty_first_page_is_an_empty_walk() {
        let explorer = Arc::new(FakeExplorer::new().with_page(0, "extrinsics", Vec::new()));
        let mut protocol = PageNumberProtocol::new(100);
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.examined, 0);
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.stop, StopReason::Empty);
    }

    #[tokio::test]
    async fn null_data_is_an_empty_walk() {
        let explorer = Arc::new(FakeExplorer::new());
        let mut protocol = PageNumberProtocol::new(100);
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.stop, StopReason::Empty);
        assert!(seen.order.is_empty());
    }

    #[tokio::test]
    async fn filtered_elements_count_toward_total() {
        let mut elements = extrinsics(&["10-1", "10-2", "10-3"]);
        elements[1]["success"] = json!(false);
        let explorer = Arc::new(FakeExplorer::new().with_page(3, "extrinsics", elements));
        let filter = FieldFilter::new(vec![FilterRule {
            field: "success".to_string(),
            equals: json!(false),
        }]);
        let mut protocol = PageNumberProtocol::new(100);
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &filter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.examined, 3);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.new, 2);
        assert_eq!(summary.stop, StopReason::CountReached);
        assert_eq!(seen.order, vec!["10-1", "10-3"]);
    }

    #[tokio::test]
    async fn cursor_advances_from_last_element() {
        let explorer = Arc::new(
            FakeExplorer::new()
                .with_page(3, "extrinsics", extrinsics(&["10-1", "10-2"]))
                .with_page(3, "extrinsics", vec![json!({ "id": 77, "extrinsic_index": "9-1" })]),
        );
        let mut protocol = CursorProtocol::new(
            2,
            Box::new(|last: &Value| {
                last.get("id")
                    .cloned()
                    .ok_or_else(|| HarvestError::protocol("missing id"))
            }),
        );
        let mut seen = SeenIds::default();

        let summary = iterator(&explorer)
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap();

        assert_eq!(summary.requests, 2);
        let requests = explorer.list_requests();
        assert!(requests[0].get("after_id").is_none());
        assert_eq!(requests[1]["after_id"], json!(2));
    }

    #[tokio::test]
    async fn page_arriving_after_cancellation_is_discarded() {
        let cancel = CancellationToken::new();
        let explorer = Arc::new(
            FakeExplorer::new()
                .with_page(4, "extrinsics", extrinsics(&["10-1", "10-2"]))
                .with_page(4, "extrinsics", extrinsics(&["9-1", "9-2"]))
                .cancel_on_request(2, cancel.clone()),
        );
        let iterator = PageIterator::new(client(&explorer), cancel);
        let mut protocol = PageNumberProtocol::new(2);
        let mut seen = SeenIds::default();

        let err = iterator
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(explorer.list_requests().len(), 2);
        assert_eq!(seen.order, vec!["10-1", "10-2"]);
    }

    #[tokio::test]
    async fn cancelled_walk_processes_nothing() {
        let explorer = Arc::new(
            FakeExplorer::new().with_page(2, "extrinsics", extrinsics(&["10-1", "10-2"])),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let iterator = PageIterator::new(client(&explorer), cancel);
        let mut protocol = PageNumberProtocol::new(100);
        let mut seen = SeenIds::default();

        let err = iterator
            .walk(&request(), &mut protocol, &NoFilter, &mut seen)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(seen.order.is_empty());
    }
}
