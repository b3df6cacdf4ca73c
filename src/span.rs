use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::context::TraceContext;
use crate::telemetry::{record_span_duration, record_span_finished};
use crate::tracer::SpanReporter;

/// Terminal status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Ok => "ok",
            SpanStatus::Error => "error",
        }
    }
}

/// Scalar value of a span tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Int(v.into())
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Str(v)
    }
}

/// One log event attached to a span, in observation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanLog {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub context: JsonValue,
    pub level: String,
}

/// Immutable record of a completed span, handed to the [`SpanReporter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedSpan {
    pub context: TraceContext,
    pub operation_name: String,
    pub service: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub tags: HashMap<String, TagValue>,
    pub logs: Vec<SpanLog>,
    pub status: SpanStatus,
}

#[derive(Debug)]
struct SpanState {
    context: TraceContext,
    operation_name: String,
    service: String,
    start_time: DateTime<Utc>,
    tags: HashMap<String, TagValue>,
    logs: Vec<SpanLog>,
    status: SpanStatus,
    finished: bool,
}

struct SpanShared {
    state: Mutex<SpanState>,
    reporter: Arc<dyn SpanReporter>,
}

/// Handle to one timed, tagged, logged unit of traced work.
///
/// Handles are cheap to clone; clones share the same underlying span, so the
/// registry's active slot and an instrumentor can mutate the same span
/// concurrently. A span produced by a disabled tracer carries no state at
/// all: every operation on it returns immediately.
///
/// `finish` takes effect at most once. After it, tags, logs and status
/// changes are silently ignored.
#[derive(Clone)]
pub struct Span {
    inner: Option<Arc<SpanShared>>,
}

impl Span {
    pub(crate) fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn start(
        context: TraceContext,
        operation_name: String,
        service: String,
        reporter: Arc<dyn SpanReporter>,
    ) -> Self {
        Self {
            inner: Some(Arc::new(SpanShared {
                state: Mutex::new(SpanState {
                    context,
                    operation_name,
                    service,
                    start_time: Utc::now(),
                    tags: HashMap::new(),
                    logs: Vec::new(),
                    status: SpanStatus::Ok,
                    finished: false,
                }),
                reporter,
            })),
        }
    }

    /// True for the stand-in spans a disabled tracer hands out.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// The span's trace context, or `None` for a no-op span.
    pub fn context(&self) -> Option<TraceContext> {
        let shared = self.inner.as_ref()?;
        shared.state.lock().ok().map(|s| s.context.clone())
    }

    pub fn operation_name(&self) -> Option<String> {
        let shared = self.inner.as_ref()?;
        shared.state.lock().ok().map(|s| s.operation_name.clone())
    }

    /// Set a tag. Keys may be overwritten; last write wins.
    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<TagValue>) {
        let Some(shared) = self.inner.as_ref() else {
            return;
        };
        let Ok(mut state) = shared.state.lock() else {
            return;
        };
        if state.finished {
            return;
        }
        state.tags.insert(key.into(), value.into());
    }

    /// Append a log event. Events keep their observation order.
    pub fn log(&self, message: impl Into<String>, context: JsonValue, level: impl Into<String>) {
        let Some(shared) = self.inner.as_ref() else {
            return;
        };
        let Ok(mut state) = shared.state.lock() else {
            return;
        };
        if state.finished {
            return;
        }
        state.logs.push(SpanLog {
            timestamp: Utc::now(),
            message: message.into(),
            context,
            level: level.into(),
        });
    }

    pub fn set_status(&self, status: SpanStatus) {
        let Some(shared) = self.inner.as_ref() else {
            return;
        };
        let Ok(mut state) = shared.state.lock() else {
            return;
        };
        if state.finished {
            return;
        }
        state.status = status;
    }

    pub fn is_finished(&self) -> bool {
        match self.inner.as_ref() {
            Some(shared) => shared.state.lock().map(|s| s.finished).unwrap_or(true),
            None => false,
        }
    }

    /// Finish the span and hand the completed record to the reporter.
    ///
    /// Only the first call has any effect. Reporting must never block the
    /// instrumented operation; the reporter contract is fire-and-forget.
    pub fn finish(&self) {
        let Some(shared) = self.inner.as_ref() else {
            return;
        };
        let finished = {
            let Ok(mut state) = shared.state.lock() else {
                return;
            };
            if state.finished {
                return;
            }
            state.finished = true;
            FinishedSpan {
                context: state.context.clone(),
                operation_name: state.operation_name.clone(),
                service: state.service.clone(),
                start_time: state.start_time,
                end_time: Utc::now(),
                tags: state.tags.clone(),
                logs: state.logs.clone(),
                status: state.status,
            }
        };

        record_span_finished(&finished.operation_name, finished.status.as_str());
        let duration = (finished.end_time - finished.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        record_span_duration(&finished.operation_name, duration);

        shared.reporter.report(finished);
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.as_ref() {
            None => f.write_str("Span(noop)"),
            Some(shared) => match shared.state.lock() {
                Ok(state) => f
                    .debug_struct("Span")
                    .field("operation_name", &state.operation_name)
                    .field("trace_id", &state.context.trace_id)
                    .field("span_id", &state.context.span_id)
                    .field("finished", &state.finished)
                    .finish(),
                Err(_) => f.write_str("Span(poisoned)"),
            },
        }
    }
}
