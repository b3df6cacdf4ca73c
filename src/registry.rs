use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use crate::config::Config;
use crate::error::ConfigError;
use crate::reporter::{BackgroundReporter, UdpReporter};
use crate::span::Span;
use crate::tracer::Tracer;

thread_local! {
    /// Stack of active spans for the current execution context. A stack,
    /// not a slot, so nested scopes restore their parent on exit.
    static ACTIVE_SPANS: RefCell<Vec<Span>> = const { RefCell::new(Vec::new()) };
}

/// Process-wide access point for the tracer and the per-execution-context
/// active span.
///
/// The tracer identity is fixed at [`init`](Self::init) and read-only
/// afterward. The active span is scoped storage: synchronous code installs
/// a span with [`install`](Self::install) or [`with_span`](Self::with_span),
/// async bodies wrap their future with [`scope`](Self::scope) so the
/// binding travels with the future rather than the worker thread. In every
/// case the prior active span is restored on all exit paths, including
/// panics, so pooled threads handling many operations never leak a span
/// from one operation into the next.
#[derive(Clone)]
pub struct TracerRegistry {
    tracer: Tracer,
    config: Arc<Config>,
}

impl TracerRegistry {
    /// Validate the configuration and construct the tracer.
    ///
    /// With `enabled=false` the tracer is a no-op and every downstream
    /// operation in this crate degrades to nothing. Otherwise a custom
    /// factory takes precedence; the default wires a [`UdpReporter`] for
    /// the configured agent address behind a [`BackgroundReporter`].
    ///
    /// Configuration problems (malformed filter patterns, unresolvable
    /// agent address) surface here, once, and never per operation.
    pub fn init(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        if config.enabled {
            crate::telemetry::register_metrics();
        }

        let tracer = if !config.enabled {
            Tracer::noop()
        } else if let Some(factory) = config.tracer_factory.as_ref() {
            factory.build(&config)?
        } else {
            let agent = UdpReporter::connect(&config.agent_address)?;
            let reporter = BackgroundReporter::start(Arc::new(agent));
            Tracer::new(config.service_name.clone(), Arc::new(reporter))
        };

        Ok(Self {
            tracer,
            config: Arc::new(config),
        })
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The active span of the calling execution context, if any.
    pub fn current() -> Option<Span> {
        ACTIVE_SPANS.with(|stack| stack.borrow().last().cloned())
    }

    /// Install `span` as active until the returned guard drops.
    ///
    /// Guards restore strictly LIFO; hold them in scope order.
    pub fn install(span: Span) -> ActiveSpanGuard {
        ACTIVE_SPANS.with(|stack| stack.borrow_mut().push(span));
        ActiveSpanGuard {
            _not_send: PhantomData,
        }
    }

    /// Run `body` with `span` active, restoring the previous active span
    /// afterward regardless of how `body` exits.
    pub fn with_span<R>(span: Span, body: impl FnOnce() -> R) -> R {
        let _guard = Self::install(span);
        body()
    }

    /// Wrap a future so `span` is active whenever it is polled.
    ///
    /// Multi-threaded runtimes migrate futures between worker threads; the
    /// wrapper re-installs the span around every poll so the binding stays
    /// with the logical execution context.
    pub fn scope<F: Future>(span: Span, future: F) -> WithActiveSpan<F> {
        WithActiveSpan {
            span,
            inner: Box::pin(future),
        }
    }
}

impl std::fmt::Debug for TracerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerRegistry")
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}

/// Restores the previously active span when dropped.
pub struct ActiveSpanGuard {
    // Thread-local storage underneath; the guard must drop on the thread
    // that created it.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ActiveSpanGuard {
    fn drop(&mut self) {
        ACTIVE_SPANS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Future wrapper produced by [`TracerRegistry::scope`].
pub struct WithActiveSpan<F> {
    span: Span,
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for WithActiveSpan<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let _guard = TracerRegistry::install(self.span.clone());
        self.inner.as_mut().poll(cx)
    }
}
