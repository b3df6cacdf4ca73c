//! Metric definitions and recording helpers.
//!
//! All metrics are prefixed with `traceline_` and use Prometheus naming
//! conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram};

// Metric name constants
pub const SPANS_STARTED_TOTAL: &str = "traceline_spans_started_total";
pub const SPANS_FINISHED_TOTAL: &str = "traceline_spans_finished_total";
pub const SPANS_DROPPED_TOTAL: &str = "traceline_spans_dropped_total";
pub const JOBS_DISPATCHED_TOTAL: &str = "traceline_jobs_dispatched_total";
pub const JOBS_EXECUTED_TOTAL: &str = "traceline_jobs_executed_total";
pub const COMMANDS_INSTRUMENTED_TOTAL: &str = "traceline_commands_instrumented_total";
pub const SPAN_LOGS_ATTACHED_TOTAL: &str = "traceline_span_logs_attached_total";

pub const SPAN_DURATION_SECONDS: &str = "traceline_span_duration_seconds";

/// Register all metric descriptions. Called once during setup.
pub fn register_metrics() {
    describe_counter!(SPANS_STARTED_TOTAL, "Total number of spans started");
    describe_counter!(SPANS_FINISHED_TOTAL, "Total number of spans finished");
    describe_counter!(
        SPANS_DROPPED_TOTAL,
        "Total number of finished spans dropped before reaching the reporter"
    );
    describe_counter!(JOBS_DISPATCHED_TOTAL, "Total number of jobs dispatched");
    describe_counter!(JOBS_EXECUTED_TOTAL, "Total number of job executions");
    describe_counter!(
        COMMANDS_INSTRUMENTED_TOTAL,
        "Total number of console commands instrumented"
    );
    describe_counter!(
        SPAN_LOGS_ATTACHED_TOTAL,
        "Total number of log events attached to spans"
    );

    describe_histogram!(SPAN_DURATION_SECONDS, "Span duration in seconds");
}

// Helper functions for recording metrics

/// Record a span start
pub fn record_span_started(operation: &str) {
    counter!(SPANS_STARTED_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Record a span finish with its terminal status
pub fn record_span_finished(operation: &str, status: &str) {
    counter!(SPANS_FINISHED_TOTAL, "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record a finished span that never reached the reporter
pub fn record_span_dropped() {
    counter!(SPANS_DROPPED_TOTAL).increment(1);
}

/// Record a job dispatch
pub fn record_job_dispatched(job_type: &str) {
    counter!(JOBS_DISPATCHED_TOTAL, "job_type" => job_type.to_string()).increment(1);
}

/// Record a job execution and its outcome
pub fn record_job_executed(job_type: &str, outcome: &str) {
    counter!(JOBS_EXECUTED_TOTAL, "job_type" => job_type.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Record an instrumented console command
pub fn record_command_instrumented(command: &str) {
    counter!(COMMANDS_INSTRUMENTED_TOTAL, "command" => command.to_string()).increment(1);
}

/// Record a log event attached to a span
pub fn record_span_log_attached() {
    counter!(SPAN_LOGS_ATTACHED_TOTAL).increment(1);
}

/// Record span duration
pub fn record_span_duration(operation: &str, duration_secs: f64) {
    histogram!(SPAN_DURATION_SECONDS, "operation" => operation.to_string()).record(duration_secs);
}
