use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

fn default_sampled() -> bool {
    true
}

/// The identity that links spans into one trace.
///
/// Every span of a trace shares the same `trace_id`; each span has its own
/// `span_id` and points at its parent via `parent_span_id`. Baggage is
/// key-value data that flows from a span to all of its children, including
/// children reconstructed on the far side of a dispatch/execute boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub baggage: HashMap<String, String>,
    #[serde(default = "default_sampled")]
    pub sampled: bool,
}

impl TraceContext {
    /// Start a fresh trace with no parent.
    pub fn new_root() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            baggage: HashMap::new(),
            sampled: true,
        }
    }

    /// Derive a child context: same trace, new span id, parent set to this
    /// context's span. Baggage and the sampling decision are inherited.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            baggage: self.baggage.clone(),
            sampled: self.sampled,
        }
    }

    /// Attach a baggage item, replacing any existing value for the key.
    pub fn with_baggage_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.baggage.insert(key.into(), value.into());
        self
    }

    pub fn baggage_item(&self, key: &str) -> Option<&str> {
        self.baggage.get(key).map(String::as_str)
    }
}
