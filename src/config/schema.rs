//! Configuration schema definitions.
//!
//! The platform describes the function through environment variables. They
//! are collected once at startup into an immutable [`FdkConfig`] and shared
//! with every invocation through an `Arc`.

use std::collections::BTreeMap;

use crate::invoke::InputMode;

/// The only transport format this kit speaks.
pub const HTTP_STREAM_FORMAT: &str = "http-stream";

/// Root configuration for the function.
#[derive(Debug, Clone)]
pub struct FdkConfig {
    /// Application name (`FN_APP_NAME`).
    pub app_name: String,

    /// Application id (`FN_APP_ID`).
    pub app_id: String,

    /// Function name (`FN_FN_NAME`).
    pub fn_name: String,

    /// Function id (`FN_FN_ID`).
    pub fn_id: String,

    /// Memory limit in MiB (`FN_MEMORY`); 0 when unknown.
    pub memory_mb: u64,

    /// Transport format (`FN_FORMAT`).
    pub format: String,

    /// Listener URL (`FN_LISTENER`), e.g. `unix:/tmp/iofs/lsnr.sock`.
    pub listener: Option<String>,

    /// Distributed tracing settings.
    pub tracing: TracingConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Every variable of the environment, including user configuration.
    pub vars: BTreeMap<String, String>,
}

impl Default for FdkConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            app_id: String::new(),
            fn_name: String::new(),
            fn_id: String::new(),
            memory_mb: 0,
            format: HTTP_STREAM_FORMAT.to_string(),
            listener: None,
            tracing: TracingConfig::default(),
            logging: LoggingConfig::default(),
            vars: BTreeMap::new(),
        }
    }
}

impl FdkConfig {
    /// Look up a raw configuration value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// `OCI_TRACING_ENABLED`.
    pub enabled: bool,

    /// `OCI_TRACE_COLLECTOR_URL`.
    pub collector_url: String,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive (`FDK_LOG`).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fdk=info".to_string(),
        }
    }
}

/// Per-function options chosen by the code that registers the handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerOptions {
    /// How request bodies are decoded.
    pub input_mode: InputMode,
}
