//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration from the environment
//! - Initialize logging
//! - Bind and publish the listener
//! - Serve until SIGINT or SIGTERM
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before the socket exists
//! - The listener is published last, so the platform only connects to a
//!   ready function

use std::sync::Arc;

use crate::config::{load_from_env, HandlerOptions};
use crate::error::FdkError;
use crate::http::{serve, Function};
use crate::invoke::Handler;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::Signals;
use crate::net::FnListener;
use crate::observability::logging;
use crate::shim::Chain;

/// Serve `handler` with default options.
pub async fn handle(handler: impl Handler) -> Result<(), FdkError> {
    run(Function::handler(handler)).await
}

/// Serve `handler` with explicit options.
pub async fn handle_with(handler: impl Handler, options: HandlerOptions) -> Result<(), FdkError> {
    run(Function::with_options(handler, options)).await
}

/// Serve a middleware chain.
pub async fn handle_middleware(chain: Chain) -> Result<(), FdkError> {
    run(Function::middleware(chain)).await
}

/// Start the function and serve it until a termination signal.
pub async fn run(function: Function) -> Result<(), FdkError> {
    let config = load_from_env()?;
    logging::init(&config.logging);

    tracing::info!(
        app = %config.app_name,
        function = %config.fn_name,
        memory_mb = config.memory_mb,
        format = %config.format,
        version = env!("CARGO_PKG_VERSION"),
        "Configuration loaded"
    );

    let address = config.listener.clone().ok_or(FdkError::MissingListener)?;
    let signals = Signals::install()?;
    let listener = FnListener::bind(&address)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let signals = tokio::spawn(async move {
        signals.recv().await;
        shutdown.trigger();
    });

    serve(listener, function, Arc::new(config), receiver).await;
    signals.abort();
    Ok(())
}
