//! Listener and lifecycle controller
//!
//! Owns the bound listener and the server-wide shutdown token. Each
//! accepted connection gets its own handler task; the accept loop never
//! waits on one. Cancelling the token stops accepting, stops the router,
//! and through the registry cancels every session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::SessionRegistry;
use crate::router::Router;

/// A bound chat server
pub struct ChatServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    /// Parent of every session token
    shutdown: CancellationToken,
    registry: SessionRegistry,
}

impl ChatServer {
    /// Bind the configured address
    pub async fn bind(config: ServerConfig, shutdown: CancellationToken) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.addr).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            shutdown,
            registry: SessionRegistry::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Registry shared with the router, for inspection
    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// Accept connections until the shutdown token is cancelled
    ///
    /// Returns after the router has stopped and closed every session.
    /// Connection handlers are not joined; they exit on their own once
    /// their session token is cancelled.
    pub async fn run(self) -> Result<(), AppError> {
        let addr = self.local_addr()?;
        info!("Chat server listening on {}", addr);

        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        let router = Router::new(
            self.registry.clone(),
            event_rx,
            self.shutdown.clone(),
            self.config.fanout_timeout,
        );
        let router_task = tokio::spawn(router.run());

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }
                result = self.listener.accept() => match result {
                    Ok((stream, peer)) => {
                        info!("New connection from {}", peer);
                        let events = event_tx.clone();
                        let registry = self.registry.clone();
                        let shutdown = self.shutdown.clone();
                        let config = Arc::clone(&self.config);

                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, events, registry, shutdown, config).await {
                                error!("Connection handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }

        drop(self.listener);
        drop(event_tx);

        router_task.await?;
        info!("Chat server stopped");
        Ok(())
    }
}
