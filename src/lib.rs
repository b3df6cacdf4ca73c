mod client;
mod codec;
mod config;
mod console;
mod context;
mod error;
mod http;
mod job;
mod logs;
mod policy;
mod registry;
mod reporter;
mod span;
mod telemetry;
mod tracer;

// Re-export public API
pub use client::Traceline;
pub use codec::{decode as decode_trace_context, encode as encode_trace_context};
pub use config::{Config, ConsoleConfig};
pub use console::{ConsoleCommandInstrumentor, ConsoleListener};
pub use context::TraceContext;
pub use error::{ConfigError, DispatchError};
pub use http::{request_tags, response_tags};
pub use job::{JobDispatchInterceptor, JobDispatcher, JobEnvelope, TRACE_CONTEXT_KEY};
pub use logs::LogSpanAnnotator;
pub use policy::ConsoleCommandFilterPolicy;
pub use registry::{ActiveSpanGuard, TracerRegistry, WithActiveSpan};
pub use reporter::{BackgroundReporter, UdpReporter};
pub use span::{FinishedSpan, Span, SpanLog, SpanStatus, TagValue};
pub use telemetry::*;
pub use tracer::{SpanReporter, Tracer, TracerFactory};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
