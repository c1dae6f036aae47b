//! Multi-client TCP Chat Server - Entry Point
//!
//! Binds the fixed address, runs the server until SIGINT/SIGTERM, then
//! shuts every session down before exiting.

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tcp_chat_server::{ChatServer, ServerConfig, ShutdownSignal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tcp_chat_server=info")),
        )
        .init();

    // Fails startup (exit 1) if the handlers cannot be installed
    let signal = ShutdownSignal::install()?;

    let shutdown = CancellationToken::new();
    let server = ChatServer::bind(ServerConfig::default(), shutdown.clone()).await?;

    info!("Press Ctrl+C to stop");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        signal.recv().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    server.run().await?;

    Ok(())
}
