use serde_json::{Map, Value};

use crate::error::Result;

/// Elements requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// What the stop rule knows about a walk in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkProgress {
    /// Total reported by the latest page
    pub total: u64,
    /// Elements accounted for so far: newly stored plus filtered out
    pub accounted: u64,
}

/// How a list endpoint is paged.
///
/// A protocol builds the body of the next request from the target's
/// template and moves forward once a page has been fully processed.
pub trait PageProtocol: Send {
    fn name(&self) -> &'static str;

    fn build_next_request(&self, template: &Map<String, Value>) -> Value;

    /// Move past the page whose final raw element is `last_element`.
    fn advance(&mut self, last_element: &Value) -> Result<()>;

    fn is_done(&self, progress: &WalkProgress) -> bool {
        progress.accounted >= progress.total
    }
}

/// `page` (0-based) + `row` paging.
pub struct PageNumberProtocol {
    page: u32,
    page_size: u32,
}

impl PageNumberProtocol {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }
}

impl PageProtocol for PageNumberProtocol {
    fn name(&self) -> &'static str {
        "page_number"
    }

    fn build_next_request(&self, template: &Map<String, Value>) -> Value {
        let mut body = template.clone();
        body.insert("row".to_string(), Value::from(self.page_size));
        body.insert("page".to_string(), Value::from(self.page));
        Value::Object(body)
    }

    fn advance(&mut self, _last_element: &Value) -> Result<()> {
        self.page += 1;
        Ok(())
    }
}

/// Maps the last raw element of a page to the next `after_id`.
pub type CursorDeducer = Box<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// `after_id` + `row` paging.
///
/// The explorer does not return a cursor, so the next `after_id` is deduced
/// from the last element of the page just processed. The first request
/// carries no `after_id`.
pub struct CursorProtocol {
    after: Option<Value>,
    page_size: u32,
    deduce: CursorDeducer,
}

impl CursorProtocol {
    pub fn new(page_size: u32, deduce: CursorDeducer) -> Self {
        Self {
            after: None,
            page_size: page_size.max(1),
            deduce,
        }
    }
}

impl PageProtocol for CursorProtocol {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn build_next_request(&self, template: &Map<String, Value>) -> Value {
        let mut body = template.clone();
        body.insert("row".to_string(), Value::from(self.page_size));
        if let Some(after) = &self.after {
            body.insert("after_id".to_string(), after.clone());
        }
        Value::Object(body)
    }

    fn advance(&mut self, last_element: &Value) -> Result<()> {
        self.after = Some((self.deduce)(last_element)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::HarvestError;

    fn template() -> Map<String, Value> {
        let mut template = Map::new();
        template.insert("module".to_string(), json!("balances"));
        template
    }

    #[test]
    fn page_number_counts_from_zero() {
        let mut protocol = PageNumberProtocol::new(100);
        assert_eq!(
            protocol.build_next_request(&template()),
            json!({ "module": "balances", "row": 100, "page": 0 })
        );

        protocol.advance(&json!({})).unwrap();
        assert_eq!(protocol.build_next_request(&template())["page"], json!(1));
    }

    #[test]
    fn cursor_is_deduced_from_last_element() {
        let mut protocol = CursorProtocol::new(
            100,
            Box::new(|last| {
                last.get("id")
                    .cloned()
                    .ok_or_else(|| HarvestError::protocol("missing id"))
            }),
        );

        let first = protocol.build_next_request(&template());
        assert!(first.get("after_id").is_none());

        protocol.advance(&json!({ "id": 9001, "extrinsic_index": "5-1" })).unwrap();
        assert_eq!(
            protocol.build_next_request(&template()),
            json!({ "module": "balances", "row": 100, "after_id": 9001 })
        );

        assert!(protocol.advance(&json!({})).is_err());
    }

    #[test]
    fn done_when_accounted_reaches_total() {
        let protocol = PageNumberProtocol::new(100);
        assert!(!protocol.is_done(&WalkProgress { total: 5, accounted: 4 }));
        assert!(protocol.is_done(&WalkProgress { total: 5, accounted: 5 }));
    }
}
