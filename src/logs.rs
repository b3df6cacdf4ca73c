use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::registry::TracerRegistry;
use crate::telemetry::record_span_log_attached;

/// Attaches log events to whichever span is currently active.
///
/// Never creates spans, never blocks, and never interferes with the log
/// event itself: whatever goes wrong while annotating, the event still
/// reaches its normal destination because this hook only observes it.
#[derive(Debug, Clone)]
pub struct LogSpanAnnotator {
    enabled: bool,
}

impl LogSpanAnnotator {
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.enabled && config.logs_enabled,
        }
    }

    /// Append `{message, context, level, timestamp: now}` to the active
    /// span, in observation order. Silent no-op without an active span or
    /// with annotation disabled.
    pub fn on_log_message(&self, message: &str, context: JsonValue, level: &str) {
        if !self.enabled {
            return;
        }
        let Some(span) = TracerRegistry::current() else {
            return;
        };
        if span.is_noop() || span.is_finished() {
            return;
        }
        span.log(message, context, level);
        record_span_log_attached();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::span::FinishedSpan;
    use crate::tracer::{SpanReporter, Tracer};
    use std::sync::{Arc, Mutex};

    struct Capture(Mutex<Vec<FinishedSpan>>);

    impl SpanReporter for Capture {
        fn report(&self, span: FinishedSpan) {
            self.0.lock().unwrap().push(span);
        }
    }

    fn enabled_annotator() -> LogSpanAnnotator {
        LogSpanAnnotator::new(&Config {
            enabled: true,
            ..Default::default()
        })
    }

    #[test]
    fn attaches_to_active_span_in_order() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let tracer = Tracer::new("test", capture.clone());
        let annotator = enabled_annotator();

        let span = tracer.start_span("op", None);
        TracerRegistry::with_span(span.clone(), || {
            annotator.on_log_message("starting", JsonValue::Null, "info");
            annotator.on_log_message(
                "charging card",
                serde_json::json!({"order": 42}),
                "debug",
            );
        });
        span.finish();

        let reported = capture.0.lock().unwrap();
        assert_eq!(reported[0].logs.len(), 2);
        assert_eq!(reported[0].logs[0].message, "starting");
        assert_eq!(reported[0].logs[1].message, "charging card");
        assert_eq!(reported[0].logs[1].context, serde_json::json!({"order": 42}));
        assert_eq!(reported[0].logs[1].level, "debug");
    }

    #[test]
    fn no_active_span_is_a_silent_noop() {
        let annotator = enabled_annotator();
        annotator.on_log_message("nowhere to go", JsonValue::Null, "info");
    }

    #[test]
    fn disabled_logs_do_not_annotate() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let tracer = Tracer::new("test", capture.clone());
        let annotator = LogSpanAnnotator::new(&Config {
            enabled: true,
            logs_enabled: false,
            ..Default::default()
        });

        let span = tracer.start_span("op", None);
        TracerRegistry::with_span(span.clone(), || {
            annotator.on_log_message("ignored", JsonValue::Null, "info");
        });
        span.finish();

        let reported = capture.0.lock().unwrap();
        assert!(reported[0].logs.is_empty());
    }
}
