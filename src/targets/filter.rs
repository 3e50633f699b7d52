use serde_json::Value;

use super::FilterRule;

/// Decides which raw list elements are skipped before processing.
pub trait ElementFilter: Send + Sync {
    /// `true` means the element is skipped.
    fn skip(&self, element: &Value) -> bool;
}

/// Accepts every element.
pub struct NoFilter;

impl ElementFilter for NoFilter {
    fn skip(&self, _element: &Value) -> bool {
        false
    }
}

/// Skips an element when any rule matches it.
///
/// Rule fields are dotted paths into the element (`"params.dest"`).
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    rules: Vec<FilterRule>,
}

impl FieldFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ElementFilter for FieldFilter {
    fn skip(&self, element: &Value) -> bool {
        self.rules
            .iter()
            .any(|rule| lookup(element, &rule.field) == Some(&rule.equals))
    }
}

fn lookup<'a>(element: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(element, |value, segment| value.get(segment))
}
