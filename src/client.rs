use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::console::ConsoleCommandInstrumentor;
use crate::error::ConfigError;
use crate::job::{JobDispatchInterceptor, JobEnvelope};
use crate::logs::LogSpanAnnotator;
use crate::registry::TracerRegistry;
use crate::tracer::Tracer;

/// Entry point wiring configuration to the instrumentation hooks.
///
/// Built once at process start; everything it hands out shares the same
/// tracer. The host calls the hooks at the matching lifecycle points;
/// this crate never subscribes to an event bus on its own.
///
/// # Example
///
/// ```ignore
/// let traceline = Traceline::init(Config {
///     enabled: true,
///     service_name: "billing".to_string(),
///     ..Default::default()
/// })?;
///
/// // Console boundary:
/// let mut console = traceline.console_instrumentor();
/// console.on_command_start("queue:work", &args);
/// let exit_code = run_command();
/// console.on_command_finish("queue:work", exit_code);
///
/// // Job boundary:
/// let interceptor = traceline.job_interceptor(queue_client);
/// interceptor.dispatch(JobEnvelope::new("send-email", params)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Traceline {
    registry: TracerRegistry,
}

impl Traceline {
    /// Validate `config` and construct the tracer. See
    /// [`TracerRegistry::init`] for the failure modes; all of them are
    /// startup-time, none are per-operation.
    pub fn init(config: Config) -> Result<Self, ConfigError> {
        Ok(Self {
            registry: TracerRegistry::init(config)?,
        })
    }

    pub fn registry(&self) -> &TracerRegistry {
        &self.registry
    }

    pub fn tracer(&self) -> &Tracer {
        self.registry.tracer()
    }

    pub fn config(&self) -> &Arc<Config> {
        self.registry.config()
    }

    /// An instrumentor for one console command run.
    pub fn console_instrumentor(&self) -> ConsoleCommandInstrumentor {
        ConsoleCommandInstrumentor::new(
            self.registry.tracer().clone(),
            &self.registry.config().console,
        )
    }

    /// The log hook; give this to the host's logging pipeline.
    pub fn log_annotator(&self) -> LogSpanAnnotator {
        LogSpanAnnotator::new(self.registry.config())
    }

    /// Wrap the host's dispatch mechanism with context injection.
    pub fn job_interceptor<D>(&self, inner: D) -> JobDispatchInterceptor<D> {
        JobDispatchInterceptor::new(self.registry.tracer().clone(), inner)
    }

    /// Execution-side convenience for hosts that only run jobs and have
    /// nothing to wrap on the dispatch side.
    pub async fn on_job_execute<T, F, Fut>(
        &self,
        envelope: JobEnvelope,
        body: F,
    ) -> anyhow::Result<T>
    where
        F: FnOnce(JobEnvelope) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        JobDispatchInterceptor::execution_only(self.registry.tracer().clone())
            .on_job_execute(envelope, body)
            .await
    }
}
