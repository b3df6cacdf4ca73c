// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use traceline::{
    async_trait, Config, ConfigError, FinishedSpan, JobDispatcher, JobEnvelope, SpanReporter,
    Tracer, TracerFactory,
};

/// Substitute backend: records every span it receives, synchronously, so
/// tests can assert on exact call counts and span contents.
#[derive(Default)]
pub struct RecordingReporter {
    spans: Mutex<Vec<FinishedSpan>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans.lock().expect("reporter lock").clone()
    }

    pub fn count(&self) -> usize {
        self.spans.lock().expect("reporter lock").len()
    }
}

impl SpanReporter for RecordingReporter {
    fn report(&self, span: FinishedSpan) {
        self.spans.lock().expect("reporter lock").push(span);
    }
}

/// Factory routing the built tracer at the recording reporter.
pub struct RecordingTracerFactory {
    reporter: Arc<RecordingReporter>,
}

impl RecordingTracerFactory {
    pub fn new(reporter: Arc<RecordingReporter>) -> Self {
        Self { reporter }
    }
}

impl TracerFactory for RecordingTracerFactory {
    fn build(&self, config: &Config) -> Result<Tracer, ConfigError> {
        Ok(Tracer::new(
            config.service_name.clone(),
            self.reporter.clone(),
        ))
    }
}

/// A config whose tracer (when enabled) reports into the returned
/// recording reporter.
pub fn recording_config(enabled: bool) -> (Config, Arc<RecordingReporter>) {
    let reporter = RecordingReporter::new();
    let config = Config {
        enabled,
        tracer_factory: Some(Arc::new(RecordingTracerFactory::new(reporter.clone()))),
        ..Default::default()
    };
    (config, reporter)
}

/// Captures dispatched envelopes instead of queueing them.
#[derive(Default)]
pub struct RecordingDispatcher {
    envelopes: Mutex<Vec<JobEnvelope>>,
}

impl RecordingDispatcher {
    pub fn envelopes(&self) -> Vec<JobEnvelope> {
        self.envelopes.lock().expect("dispatcher lock").clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn dispatch(&self, envelope: JobEnvelope) -> anyhow::Result<()> {
        self.envelopes
            .lock()
            .expect("dispatcher lock")
            .push(envelope);
        Ok(())
    }
}

/// Always fails, standing in for an unavailable queue backend.
pub struct FailingDispatcher;

#[async_trait]
impl JobDispatcher for FailingDispatcher {
    async fn dispatch(&self, _envelope: JobEnvelope) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("queue unavailable"))
    }
}
