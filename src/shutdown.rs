//! Process shutdown signals
//!
//! Handlers are installed up front so a failure surfaces as a startup
//! error instead of an immediate shutdown.

use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed SIGINT/SIGTERM listeners (Ctrl+C elsewhere)
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownSignal {
    /// Install the handlers. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sigint: signal(SignalKind::interrupt())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the first shutdown signal
    #[cfg_attr(not(unix), allow(unused_mut))]
    pub async fn recv(mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigterm.recv() => info!("Received SIGTERM"),
                _ = self.sigint.recv() => info!("Received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_install_does_not_fire() {
        let signal = ShutdownSignal::install().expect("install signal handlers");

        let fired = tokio::time::timeout(Duration::from_millis(50), signal.recv()).await;
        assert!(fired.is_err());
    }
}
