//! Zipkin B3 tracing context for the current invocation.

use crate::config::FdkConfig;
use crate::protocol::names::{FLAGS, PARENT_SPAN_ID, SAMPLED, SPAN_ID, TRACE_ID};
use crate::protocol::HeaderMap;

/// Tracing data the platform propagated with the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingContext {
    pub is_enabled: bool,
    pub trace_collector_url: String,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub sampled: bool,
    pub flags: Option<String>,
    /// `<app>::<function>`, lower-cased.
    pub service_name: String,
}

impl TracingContext {
    pub fn extract(config: &FdkConfig, headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).map(str::to_string);
        Self {
            is_enabled: config.tracing.enabled,
            trace_collector_url: config.tracing.collector_url.clone(),
            trace_id: header(TRACE_ID),
            span_id: header(SPAN_ID),
            parent_span_id: header(PARENT_SPAN_ID),
            sampled: headers.get(SAMPLED).map_or(true, |s| s.trim() != "0"),
            flags: header(FLAGS),
            service_name: format!("{}::{}", config.app_name, config.fn_name).to_lowercase(),
        }
    }
}
