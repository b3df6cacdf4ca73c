//! Backend-agnostic metric recording for the instrumentation core itself.
//!
//! This module does **not** install a recorder; configure one in your
//! application and the library will emit counters and histograms through
//! the `metrics` facade. Without a recorder every helper is inert, and in
//! no-op tracing mode none of them are reached at all.

mod metrics;

pub use metrics::*;
