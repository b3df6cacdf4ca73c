use std::sync::Arc;

use crate::config::Config;
use crate::context::TraceContext;
use crate::error::ConfigError;
use crate::span::{FinishedSpan, Span};
use crate::telemetry::record_span_started;

/// Boundary to the external collector.
///
/// Implementations receive completed spans and ship them wherever they go.
/// The contract is fire-and-forget: `report` must not block the caller on
/// network I/O or acknowledgement, and any delivery failure is the
/// implementation's to swallow. The instrumented operation never learns
/// about it; only the span is lost.
pub trait SpanReporter: Send + Sync + 'static {
    fn report(&self, span: FinishedSpan);
}

/// Injectable tracer constructor, selectable at startup via
/// [`Config::tracer_factory`].
pub trait TracerFactory: Send + Sync {
    fn build(&self, config: &Config) -> Result<Tracer, ConfigError>;
}

struct TracerInner {
    service_name: String,
    reporter: Arc<dyn SpanReporter>,
}

/// Starts spans and routes finished ones to a reporter.
///
/// A tracer is constructed once at startup and treated as read-only
/// afterward; handles are cheap to clone and safe to share across
/// execution contexts. The no-op tracer is the global kill switch: every
/// span it hands out is an empty stand-in and nothing ever reaches a
/// reporter, with zero serialization or network cost.
#[derive(Clone)]
pub struct Tracer {
    inner: Option<Arc<TracerInner>>,
}

impl Tracer {
    /// A tracer that records nothing. Used when tracing is disabled.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// A tracer that reports finished spans through `reporter`, stamping
    /// each with `service_name`.
    pub fn new(service_name: impl Into<String>, reporter: Arc<dyn SpanReporter>) -> Self {
        Self {
            inner: Some(Arc::new(TracerInner {
                service_name: service_name.into(),
                reporter,
            })),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Start a span, parented to `parent` when given, rooted otherwise.
    pub fn start_span(&self, operation_name: &str, parent: Option<&TraceContext>) -> Span {
        let Some(inner) = self.inner.as_ref() else {
            return Span::noop();
        };
        let context = match parent {
            Some(parent) => parent.child(),
            None => TraceContext::new_root(),
        };
        record_span_started(operation_name);
        Span::start(
            context,
            operation_name.to_string(),
            inner.service_name.clone(),
            inner.reporter.clone(),
        )
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.as_ref() {
            None => f.write_str("Tracer(noop)"),
            Some(inner) => f
                .debug_struct("Tracer")
                .field("service_name", &inner.service_name)
                .finish_non_exhaustive(),
        }
    }
}
