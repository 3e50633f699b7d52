use serde_json::Value;

use crate::error::{HarvestError, Result};

/// A normalized list page: `{count, <list_key>: [elements]}`.
#[derive(Debug, Default)]
pub(crate) struct Page {
    pub(crate) count: u64,
    pub(crate) elements: Vec<Value>,
}

impl Page {
    /// `null` data, a missing count and a `null` element list all read as empty.
    pub(crate) fn parse(data: Value, list_key: &str) -> Result<Self> {
        let mut object = match data {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(HarvestError::protocol(format!(
                    "list payload is not an object: {other}"
                )));
            }
        };

        let count = match object.get("count") {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                HarvestError::protocol(format!("list count is not a number: {value}"))
            })?,
        };

        let elements = match object.remove(list_key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(elements)) => elements,
            Some(other) => {
                return Err(HarvestError::protocol(format!(
                    "`{list_key}` is not an array: {other}"
                )));
            }
        };

        Ok(Self { count, elements })
    }
}
