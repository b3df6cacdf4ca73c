use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::policy::ConsoleCommandFilterPolicy;
use crate::registry::{ActiveSpanGuard, TracerRegistry};
use crate::span::{Span, SpanStatus};
use crate::telemetry::record_command_instrumented;
use crate::tracer::Tracer;

/// Observes command start/finish on an instrumented span.
///
/// The default listener tags `command`, `arguments` and `exit_code`;
/// hosts replace it via [`ConsoleConfig::listener`] to tag differently.
/// Listeners only decorate: span lifecycle, the active-span binding and
/// the exit-status mapping stay with the instrumentor.
pub trait ConsoleListener: Send + Sync {
    fn on_started(&self, span: &Span, command: &str, arguments: &[String]);
    fn on_finished(&self, span: &Span, command: &str, exit_code: i32);
}

pub(crate) struct TaggingConsoleListener {
    redact_arguments: bool,
}

impl ConsoleListener for TaggingConsoleListener {
    fn on_started(&self, span: &Span, command: &str, arguments: &[String]) {
        span.set_tag("command", command);
        let arguments = if self.redact_arguments {
            "<redacted>".to_string()
        } else {
            arguments.join(" ")
        };
        span.set_tag("arguments", arguments);
    }

    fn on_finished(&self, span: &Span, _command: &str, exit_code: i32) {
        span.set_tag("exit_code", exit_code);
    }
}

enum CommandState {
    NotStarted,
    Running {
        span: Span,
        guard: ActiveSpanGuard,
    },
    Finished,
}

/// Span lifecycle around one console command run.
///
/// `NotStarted → Running` on [`on_command_start`](Self::on_command_start),
/// `Running → Finished` on [`on_command_finish`](Self::on_command_finish).
/// A disabled tracer or a denied command is checked before anything else
/// happens: no span is created, no listener runs, no tag is computed, and
/// the state machine never leaves `NotStarted`.
///
/// Holds an [`ActiveSpanGuard`], so one instrumentor serves one command on
/// the thread that runs it.
pub struct ConsoleCommandInstrumentor {
    tracer: Tracer,
    policy: ConsoleCommandFilterPolicy,
    listener: Arc<dyn ConsoleListener>,
    state: CommandState,
}

impl ConsoleCommandInstrumentor {
    pub fn new(tracer: Tracer, console: &ConsoleConfig) -> Self {
        let listener = console.listener.clone().unwrap_or_else(|| {
            Arc::new(TaggingConsoleListener {
                redact_arguments: console.redact_arguments,
            })
        });
        Self {
            tracer,
            policy: console.filter.clone(),
            listener,
            state: CommandState::NotStarted,
        }
    }

    /// Open a span for the command and install it as active, iff tracing
    /// is enabled and the policy allows the name. Repeated calls while
    /// running are inert.
    pub fn on_command_start(&mut self, name: &str, arguments: &[String]) {
        if !matches!(self.state, CommandState::NotStarted) {
            return;
        }
        if !self.tracer.is_enabled() || !self.policy.allows(name) {
            return;
        }

        let span = self.tracer.start_span(name, None);
        self.listener.on_started(&span, name, arguments);
        let guard = TracerRegistry::install(span.clone());
        record_command_instrumented(name);
        self.state = CommandState::Running { span, guard };
    }

    /// Finish the command span: status `ok` for exit code 0, `error`
    /// otherwise. Inert unless a span was started.
    pub fn on_command_finish(&mut self, name: &str, exit_code: i32) {
        match std::mem::replace(&mut self.state, CommandState::Finished) {
            CommandState::Running { span, guard } => {
                self.listener.on_finished(&span, name, exit_code);
                span.set_status(if exit_code == 0 {
                    SpanStatus::Ok
                } else {
                    SpanStatus::Error
                });
                span.finish();
                drop(guard);
            }
            other => {
                // Not running (denied or never started): stay put.
                self.state = other;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CommandState::Running { .. })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::span::FinishedSpan;
    use crate::tracer::SpanReporter;
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<FinishedSpan>>);

    impl SpanReporter for Capture {
        fn report(&self, span: FinishedSpan) {
            self.0.lock().unwrap().push(span);
        }
    }

    fn setup(console: ConsoleConfig) -> (ConsoleCommandInstrumentor, Arc<Capture>) {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let tracer = Tracer::new("test", capture.clone());
        (ConsoleCommandInstrumentor::new(tracer, &console), capture)
    }

    #[test]
    fn denied_command_never_leaves_not_started() {
        let console = ConsoleConfig {
            filter: ConsoleCommandFilterPolicy {
                allow: vec!["queue:*".to_string()],
                deny: vec![],
            },
            ..Default::default()
        };
        let (mut instrumentor, capture) = setup(console);

        instrumentor.on_command_start("migrate", &[]);
        assert!(!instrumentor.is_running());
        assert!(TracerRegistry::current().is_none());

        instrumentor.on_command_finish("migrate", 0);
        assert!(!instrumentor.is_running());
        assert!(capture.0.lock().unwrap().is_empty());
    }

    #[test]
    fn disabled_tracer_runs_no_listener_work() {
        struct Counting(Arc<Mutex<usize>>);

        impl ConsoleListener for Counting {
            fn on_started(&self, _span: &Span, _command: &str, _arguments: &[String]) {
                *self.0.lock().unwrap() += 1;
            }

            fn on_finished(&self, _span: &Span, _command: &str, _exit_code: i32) {
                *self.0.lock().unwrap() += 1;
            }
        }

        let calls = Arc::new(Mutex::new(0usize));
        let console = ConsoleConfig {
            listener: Some(Arc::new(Counting(calls.clone()))),
            ..Default::default()
        };
        let mut instrumentor = ConsoleCommandInstrumentor::new(Tracer::noop(), &console);

        instrumentor.on_command_start("queue:work", &["--tries=3".to_string()]);
        assert!(!instrumentor.is_running());
        assert!(TracerRegistry::current().is_none());
        instrumentor.on_command_finish("queue:work", 0);

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn finish_without_start_is_inert() {
        let (mut instrumentor, capture) = setup(ConsoleConfig::default());
        instrumentor.on_command_finish("queue:work", 0);
        assert!(capture.0.lock().unwrap().is_empty());
    }

    #[test]
    fn redacted_arguments_replace_command_line() {
        let console = ConsoleConfig {
            redact_arguments: true,
            ..Default::default()
        };
        let (mut instrumentor, capture) = setup(console);

        instrumentor.on_command_start("deploy", &["--token".to_string(), "s3cr3t".to_string()]);
        instrumentor.on_command_finish("deploy", 0);

        let reported = capture.0.lock().unwrap();
        assert_eq!(
            reported[0].tags.get("arguments"),
            Some(&crate::span::TagValue::from("<redacted>"))
        );
    }
}
