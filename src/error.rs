//! Error types for the chat server
//!
//! Defines application-level errors and per-recipient delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// Covers both connection errors (the session closes) and protocol
/// errors (a notice is sent to the client before closing).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error, including over-long lines
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Router channel closed (server shutting down)
    #[error("Channel send error")]
    ChannelSend,

    /// Per-connection task panicked or was aborted
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Display name already registered
    #[error("Name already taken: {0}")]
    NameConflict(String),

    /// Empty display name
    #[error("Name must not be empty")]
    EmptyName,

    /// Display name failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

/// Delivery errors
///
/// Result of one attempt to enqueue a message for a single recipient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the queue has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The queue stayed full for the whole fan-out timeout
    #[error("Queue full, delivery timed out")]
    Timeout,
}
