//! Line-mode chat client - Entry Point
//!
//! Usage: `tcp_chat_client [host:port]`

use std::env;
use std::process;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tcp_chat_server::{run_client, DEFAULT_CLIENT_ADDR};

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so they never interleave with chat output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tcp_chat_server=warn")),
        )
        .init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CLIENT_ADDR.to_string());

    println!("Connecting to {}...", addr);

    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: could not connect to {}: {}", addr, e);
            process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nDisconnecting...");
            interrupt.cancel();
        }
    });

    let code = match run_client(stream, tokio::io::stdin(), tokio::io::stdout(), shutdown).await {
        Ok(()) => {
            println!("Disconnected from server");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // stdin is read on a blocking thread that would keep the runtime alive
    process::exit(code);
}
