use thiserror::Error;

/// Startup-time configuration failures.
///
/// These are reported once, when [`TracerRegistry::init`](crate::TracerRegistry::init)
/// validates the configuration. Nothing in this enum is ever raised per
/// instrumented operation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A console filter pattern uses `*` anywhere except the trailing position.
    #[error("invalid console filter pattern {pattern:?}: '*' is only supported as a trailing wildcard")]
    FilterPattern { pattern: String },

    /// The agent address could not be resolved at startup.
    #[error("invalid agent address {address:?}: {reason}")]
    AgentAddress { address: String, reason: String },

    /// A custom tracer factory refused to build a tracer.
    #[error("custom tracer factory failed: {message}")]
    TracerFactory { message: String },
}

/// Errors surfaced by the dispatch side of the job interceptor.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// User-supplied envelope headers must not use the reserved prefix.
    #[error("header key {key:?} uses the reserved \"traceline::\" prefix")]
    ReservedHeaderKey { key: String },

    /// The wrapped dispatcher failed. Propagated unchanged, never retried.
    #[error(transparent)]
    Dispatcher(#[from] anyhow::Error),
}
