//! Multi-client TCP Chat Server Library
//!
//! A line-oriented chat service over plain TCP. Clients pick a unique
//! display name and then share a single room with join/leave notices and
//! a small command set (`/users`, `/help`, `/quit`).
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Router` is the single actor that mutates the `SessionRegistry`;
//!   join, leave and chat events are processed one at a time
//! - Each connection runs a handler with separate read and write tasks
//! - Every session token is a child of the server-wide shutdown token
//!
//! # Example
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use tcp_chat_server::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let shutdown = CancellationToken::new();
//!     let server = ChatServer::bind(ServerConfig::default(), shutdown.clone())
//!         .await
//!         .unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod types;

// Re-export main types for convenience
pub use client::run_client;
pub use command::Command;
pub use config::{ServerConfig, DEFAULT_ADDR, DEFAULT_CLIENT_ADDR};
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ChatMessage, MessageKind};
pub use registry::SessionRegistry;
pub use router::{Event, Router};
pub use server::ChatServer;
pub use session::SessionHandle;
pub use shutdown::ShutdownSignal;
pub use types::{ConnectionId, DisplayName};
