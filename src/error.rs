//! Crate-level error type for starting and running a function.

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::ListenerError;

#[derive(Debug, Error)]
pub enum FdkError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `FN_LISTENER` is needed to serve but was not set.
    #[error("FN_LISTENER is not set")]
    MissingListener,

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
