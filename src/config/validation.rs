//! Configuration validation.
//!
//! Serde and the loader handle syntax; this module checks meaning and
//! returns every problem found rather than stopping at the first.

use thiserror::Error;

use crate::config::schema::{FdkConfig, HTTP_STREAM_FORMAT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("FN_FORMAT must be {HTTP_STREAM_FORMAT:?}, got {0:?}")]
    UnsupportedFormat(String),

    #[error("FN_LISTENER must be a unix: URL, got {0:?}")]
    UnsupportedListener(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &FdkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.format != HTTP_STREAM_FORMAT {
        errors.push(ValidationError::UnsupportedFormat(config.format.clone()));
    }

    if let Some(listener) = &config.listener {
        if !listener.starts_with("unix:") || listener.len() == "unix:".len() {
            errors.push(ValidationError::UnsupportedListener(listener.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
