//! Invocation metrics.
//!
//! # Metrics
//! - `fdk_invocations_total` (counter): invocations by outcome
//! - `fdk_invocation_duration_seconds` (histogram): time from request
//!   head to response head
//! - `fdk_connections_active` (gauge): live transport connections
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter is installed, so
//!   the calls are no-ops unless the embedding binary installs a recorder

use std::time::Instant;

/// How one invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Result encoded with status 200.
    Success,
    /// Not `POST /call`.
    Rejected,
    /// The request body could not be read.
    BodyError,
    /// User code returned an error or panicked.
    FunctionError,
    /// A middleware chain failed.
    MiddlewareError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Rejected => "rejected",
            Outcome::BodyError => "body_error",
            Outcome::FunctionError => "function_error",
            Outcome::MiddlewareError => "middleware_error",
        }
    }
}

pub fn record_invocation(outcome: Outcome, started: Instant) {
    metrics::counter!("fdk_invocations_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("fdk_invocation_duration_seconds", "outcome" => outcome.as_str())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_connection_opened() {
    metrics::gauge!("fdk_connections_active").increment(1.0);
}

pub fn record_connection_closed() {
    metrics::gauge!("fdk_connections_active").decrement(1.0);
}
