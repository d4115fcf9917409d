//! Configuration loading from the process environment.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::schema::FdkConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Parse { key: &'static str, value: String },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the current environment.
pub fn load_from_env() -> Result<FdkConfig, ConfigError> {
    load_from_vars(std::env::vars())
}

/// Load and validate configuration from explicit key/value pairs.
pub fn load_from_vars<I, K, V>(vars: I) -> Result<FdkConfig, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    let var = |key: &str| vars.get(key).cloned().filter(|v| !v.is_empty());

    let mut config = FdkConfig::default();

    if let Some(v) = var("FN_APP_NAME") {
        config.app_name = v;
    }
    if let Some(v) = var("FN_APP_ID") {
        config.app_id = v;
    }
    if let Some(v) = var("FN_FN_NAME") {
        config.fn_name = v;
    }
    if let Some(v) = var("FN_FN_ID") {
        config.fn_id = v;
    }
    if let Some(v) = var("FN_MEMORY") {
        config.memory_mb = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse { key: "FN_MEMORY", value: v.clone() })?;
    }
    if let Some(v) = var("FN_FORMAT") {
        config.format = v;
    }
    config.listener = var("FN_LISTENER");
    if let Some(v) = var("OCI_TRACING_ENABLED") {
        config.tracing.enabled = parse_flag(&v)
            .ok_or(ConfigError::Parse { key: "OCI_TRACING_ENABLED", value: v.clone() })?;
    }
    if let Some(v) = var("OCI_TRACE_COLLECTOR_URL") {
        config.tracing.collector_url = v;
    }
    if let Some(v) = var("FDK_LOG") {
        config.logging.filter = v;
    }
    config.vars = vars;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load_from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.app_name, "");
        assert_eq!(config.memory_mb, 0);
        assert_eq!(config.format, "http-stream");
        assert!(config.listener.is_none());
        assert!(!config.tracing.enabled);
    }

    #[test]
    fn reads_platform_variables() {
        let config = load_from_vars([
            ("FN_APP_NAME", "shop"),
            ("FN_APP_ID", "app1"),
            ("FN_FN_NAME", "checkout"),
            ("FN_FN_ID", "fn1"),
            ("FN_MEMORY", "128"),
            ("FN_LISTENER", "unix:/tmp/iofs/lsnr.sock"),
            ("OCI_TRACING_ENABLED", "1"),
            ("OCI_TRACE_COLLECTOR_URL", "http://zipkin:9411"),
            ("GREETING", "hello"),
        ])
        .unwrap();

        assert_eq!(config.app_name, "shop");
        assert_eq!(config.fn_id, "fn1");
        assert_eq!(config.memory_mb, 128);
        assert_eq!(config.listener.as_deref(), Some("unix:/tmp/iofs/lsnr.sock"));
        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.collector_url, "http://zipkin:9411");
        assert_eq!(config.get("GREETING"), Some("hello"));
    }

    #[test]
    fn rejects_bad_memory() {
        let err = load_from_vars([("FN_MEMORY", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { key: "FN_MEMORY", .. }));
    }

    #[test]
    fn rejects_other_formats() {
        let err = load_from_vars([("FN_FORMAT", "json"), ("FN_LISTENER", "tcp:8080")])
            .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
