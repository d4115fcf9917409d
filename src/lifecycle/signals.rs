//! OS signal handling.
//!
//! SIGTERM (sent by the platform when the container is retired) and SIGINT
//! both end the accept loop. The SIGTERM handler is installed during
//! startup so a failure surfaces before the socket is published.

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::error::FdkError;

/// Installed termination handlers.
#[derive(Debug)]
pub struct Signals {
    terminate: Signal,
}

impl Signals {
    /// Register the SIGTERM handler.
    pub fn install() -> Result<Self, FdkError> {
        let terminate = signal(SignalKind::terminate()).map_err(FdkError::Signal)?;
        Ok(Self { terminate })
    }

    /// Resolve when SIGINT or SIGTERM arrives.
    pub async fn recv(mut self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("Received SIGINT"),
                Err(err) => {
                    tracing::warn!(error = %err, "SIGINT handler unavailable, waiting for SIGTERM");
                    self.terminate.recv().await;
                    tracing::info!("Received SIGTERM");
                }
            },
            _ = self.terminate.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }
}
