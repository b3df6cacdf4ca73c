//! Built-in reporters: a background channel that decouples span completion
//! from delivery, and a UDP shipper for a local collector agent.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ConfigError;
use crate::span::FinishedSpan;
use crate::telemetry::record_span_dropped;
use crate::tracer::SpanReporter;

/// Wraps another reporter so that delivery happens off the caller's path.
///
/// Finished spans go over an unbounded channel to a background task that
/// drains them into the inner reporter. `report` never blocks and never
/// fails; if the drain task is gone the span is counted as dropped.
///
/// Needs a tokio runtime to host the drain task. When constructed outside
/// one, delivery falls back to running inline on the finishing thread.
pub struct BackgroundReporter {
    mode: Mode,
}

enum Mode {
    Channel(mpsc::UnboundedSender<FinishedSpan>),
    Inline(Arc<dyn SpanReporter>),
}

impl BackgroundReporter {
    pub fn start(inner: Arc<dyn SpanReporter>) -> Self {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<FinishedSpan>();
                handle.spawn(async move {
                    while let Some(span) = rx.recv().await {
                        inner.report(span);
                    }
                });
                Self {
                    mode: Mode::Channel(tx),
                }
            }
            Err(_) => {
                tracing::warn!(
                    "no tokio runtime at tracer init; span reporting will run inline"
                );
                Self {
                    mode: Mode::Inline(inner),
                }
            }
        }
    }
}

impl SpanReporter for BackgroundReporter {
    fn report(&self, span: FinishedSpan) {
        match &self.mode {
            Mode::Channel(tx) => {
                if tx.send(span).is_err() {
                    record_span_dropped();
                }
            }
            Mode::Inline(inner) => inner.report(span),
        }
    }
}

/// Ships spans as JSON datagrams to a collector agent address.
///
/// The address is resolved once at startup; resolution failure is a
/// [`ConfigError`]. After that, every send is best-effort: the socket is
/// non-blocking and send errors are discarded, so an unreachable agent
/// costs the instrumented operation nothing but the lost span.
pub struct UdpReporter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpReporter {
    pub fn connect(address: &str) -> Result<Self, ConfigError> {
        let target = address
            .to_socket_addrs()
            .map_err(|e| ConfigError::AgentAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ConfigError::AgentAddress {
                address: address.to_string(),
                reason: "resolved to no addresses".to_string(),
            })?;

        let bind_addr: SocketAddr = if target.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|_| ConfigError::AgentAddress {
                address: address.to_string(),
                reason: "failed to bind local socket".to_string(),
            })?
        } else {
            "[::]:0".parse().map_err(|_| ConfigError::AgentAddress {
                address: address.to_string(),
                reason: "failed to bind local socket".to_string(),
            })?
        };

        let socket = UdpSocket::bind(bind_addr).map_err(|e| ConfigError::AgentAddress {
            address: address.to_string(),
            reason: format!("failed to bind local socket: {e}"),
        })?;
        if let Err(e) = socket.set_nonblocking(true) {
            tracing::warn!("could not set reporter socket non-blocking: {e}");
        }

        Ok(Self { socket, target })
    }
}

impl SpanReporter for UdpReporter {
    fn report(&self, span: FinishedSpan) {
        let Ok(payload) = serde_json::to_vec(&span) else {
            return;
        };
        let _ = self.socket.send_to(&payload, self.target);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::context::TraceContext;
    use crate::span::SpanStatus;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Capture(Mutex<Vec<FinishedSpan>>);

    impl SpanReporter for Capture {
        fn report(&self, span: FinishedSpan) {
            self.0.lock().unwrap().push(span);
        }
    }

    fn fake_span() -> FinishedSpan {
        let now = Utc::now();
        FinishedSpan {
            context: TraceContext::new_root(),
            operation_name: "op".to_string(),
            service: "svc".to_string(),
            start_time: now,
            end_time: now,
            tags: HashMap::new(),
            logs: Vec::new(),
            status: SpanStatus::Ok,
        }
    }

    #[tokio::test]
    async fn background_reporter_delivers_to_inner() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let reporter = BackgroundReporter::start(capture.clone());

        reporter.report(fake_span());
        reporter.report(fake_span());

        // The drain task runs on the same runtime; yield until it catches up.
        for _ in 0..50 {
            if capture.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(capture.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn background_reporter_runs_inline_without_runtime() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let reporter = BackgroundReporter::start(capture.clone());

        reporter.report(fake_span());
        assert_eq!(capture.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn udp_reporter_rejects_bad_address() {
        assert!(matches!(
            UdpReporter::connect("not an address"),
            Err(ConfigError::AgentAddress { .. })
        ));
    }

    #[test]
    fn udp_reporter_send_is_best_effort() {
        let reporter = UdpReporter::connect("127.0.0.1:6831").unwrap();
        // Nothing is listening; send must still not fail or block.
        reporter.report(fake_span());
    }
}
