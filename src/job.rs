use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;

use crate::codec;
use crate::context::TraceContext;
use crate::error::DispatchError;
use crate::registry::TracerRegistry;
use crate::span::{Span, SpanStatus};
use crate::telemetry::{record_job_dispatched, record_job_executed};
use crate::tracer::Tracer;

/// Reserved envelope header carrying the encoded trace context.
pub const TRACE_CONTEXT_KEY: &str = "traceline::trace_context";

const RESERVED_HEADER_PREFIX: &str = "traceline::";

/// A job's payload plus the metadata this crate propagates with it.
///
/// `job_type` is an explicit name declared by the dispatching code; it
/// names the spans on both sides of the dispatch/execute boundary. The
/// headers map belongs to the host except for the `traceline::` prefix,
/// which is reserved: the dispatch side writes the encoded trace context
/// under [`TRACE_CONTEXT_KEY`], and the execution side removes it before
/// the payload reaches business logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_type: String,
    pub payload: JsonValue,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, JsonValue>,
}

impl JobEnvelope {
    pub fn new(job_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            job_type: job_type.into(),
            payload,
            headers: HashMap::new(),
        }
    }

    /// Peek at the propagated context without consuming it.
    pub fn trace_context(&self) -> Option<TraceContext> {
        self.headers
            .get(TRACE_CONTEXT_KEY)
            .and_then(JsonValue::as_str)
            .and_then(codec::decode)
    }

    /// Remove and decode the reserved header. A missing or malformed
    /// value decodes to `None`; either way the header is gone afterward.
    pub fn take_trace_context(&mut self) -> Option<TraceContext> {
        self.headers
            .remove(TRACE_CONTEXT_KEY)
            .as_ref()
            .and_then(JsonValue::as_str)
            .and_then(codec::decode)
    }

    fn inject_trace_context(&mut self, ctx: &TraceContext) {
        self.headers.insert(
            TRACE_CONTEXT_KEY.to_string(),
            JsonValue::String(codec::encode(ctx)),
        );
    }
}

/// The underlying dispatch mechanism the interceptor wraps.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, envelope: JobEnvelope) -> anyhow::Result<()>;
}

#[async_trait]
impl<D: JobDispatcher + ?Sized> JobDispatcher for std::sync::Arc<D> {
    async fn dispatch(&self, envelope: JobEnvelope) -> anyhow::Result<()> {
        (**self).dispatch(envelope).await
    }
}

/// Span lifecycle and context propagation across the dispatch/execute
/// boundary.
///
/// On dispatch, a child span of the current active span records the act of
/// scheduling and its context rides along in the envelope. On execution,
/// whenever and wherever that happens, the context is decoded and the
/// trace resumes. Each execution reconstructs its span purely from its own
/// envelope, so arbitrarily many jobs run concurrently without sharing
/// state.
pub struct JobDispatchInterceptor<D = ()> {
    tracer: Tracer,
    inner: D,
}

impl JobDispatchInterceptor<()> {
    /// An interceptor for the execution side only, where there is no
    /// dispatch mechanism to wrap.
    pub fn execution_only(tracer: Tracer) -> Self {
        Self { tracer, inner: () }
    }
}

impl<D> JobDispatchInterceptor<D> {
    pub fn new(tracer: Tracer, inner: D) -> Self {
        Self { tracer, inner }
    }

    /// Dispatch-side hook: derive a child span from the current active
    /// span, embed its context in the envelope, and finish the span
    /// immediately: it represents the act of scheduling, not the job's
    /// eventual execution, which may happen in another process entirely.
    ///
    /// With no active span there is nothing to relate a child to, so the
    /// envelope passes through untouched. Injection mutates the envelope
    /// in one step; a caller cancelled mid-dispatch never observes a
    /// half-written envelope.
    pub fn on_job_dispatch(&self, mut envelope: JobEnvelope) -> JobEnvelope {
        let Some(active) = TracerRegistry::current() else {
            return envelope;
        };
        let Some(parent) = active.context() else {
            // No-op tracer: nothing to propagate, at zero cost.
            return envelope;
        };

        let span = self.tracer.start_span(&envelope.job_type, Some(&parent));
        if let Some(ctx) = span.context() {
            envelope.inject_trace_context(&ctx);
        }
        span.finish();
        envelope
    }

    /// Execution-side hook, invoked by the external job runner.
    ///
    /// Decodes the reserved header (absent or malformed means a fresh root
    /// trace), opens a span named from the job type, installs it as active
    /// around `body`, and finishes it on every exit. A panicking body (or
    /// a future dropped mid-execution) finishes the span with error status
    /// while unwinding. The envelope handed to `body` no longer carries
    /// the reserved header.
    ///
    /// A failing body is observed (an `error=true` tag, a log entry with
    /// the failure message, status `error`) and then re-propagated
    /// unchanged.
    pub async fn on_job_execute<T, F, Fut>(
        &self,
        mut envelope: JobEnvelope,
        body: F,
    ) -> anyhow::Result<T>
    where
        F: FnOnce(JobEnvelope) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let parent = envelope.take_trace_context();
        let job_type = envelope.job_type.clone();
        let span = self.tracer.start_span(&job_type, parent.as_ref());
        let mut guard = FinishGuard::new(span.clone());

        let result = TracerRegistry::scope(span.clone(), body(envelope)).await;
        guard.disarm();

        match &result {
            Ok(_) => {
                span.set_status(SpanStatus::Ok);
                if !span.is_noop() {
                    record_job_executed(&job_type, "ok");
                }
            }
            Err(error) => {
                span.set_tag("error", true);
                span.log(error.to_string(), JsonValue::Null, "error");
                span.set_status(SpanStatus::Error);
                if !span.is_noop() {
                    record_job_executed(&job_type, "error");
                }
            }
        }
        span.finish();

        result
    }
}

/// Finishes the job span with error status if execution unwinds before
/// the normal completion path disarms it. Covers a panicking body and a
/// future dropped mid-execution.
struct FinishGuard {
    span: Span,
    armed: bool,
}

impl FinishGuard {
    fn new(span: Span) -> Self {
        Self { span, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if self.armed {
            self.span.set_tag("error", true);
            self.span.set_status(SpanStatus::Error);
            self.span.finish();
        }
    }
}

impl<D: JobDispatcher> JobDispatchInterceptor<D> {
    /// Inject the current trace context and delegate to the wrapped
    /// dispatcher. Dispatcher errors propagate unchanged; no context
    /// mutation is retried.
    pub async fn dispatch(&self, envelope: JobEnvelope) -> Result<(), DispatchError> {
        for key in envelope.headers.keys() {
            if key.starts_with(RESERVED_HEADER_PREFIX) {
                return Err(DispatchError::ReservedHeaderKey { key: key.clone() });
            }
        }

        let envelope = self.on_job_dispatch(envelope);
        if self.tracer.is_enabled() {
            record_job_dispatched(&envelope.job_type);
        }
        self.inner
            .dispatch(envelope)
            .await
            .map_err(DispatchError::Dispatcher)
    }
}
