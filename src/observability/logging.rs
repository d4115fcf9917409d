//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once
//! - Take the filter from configuration (`FDK_LOG`)
//!
//! # Design Decisions
//! - Logs go to stderr; stdout belongs to the function
//! - A second `init` is a no-op, so tests and embedders can call it freely

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const FALLBACK_FILTER: &str = "fdk=info";

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?} ({err}), using {FALLBACK_FILTER}", config.filter);
        EnvFilter::new(FALLBACK_FILTER)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
