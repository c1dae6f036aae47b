//! Session handle definition
//!
//! The registry-side reference to one connected, named client: its name,
//! the sending half of its bounded outbound queue, and its cancellation
//! token. The socket and the receiving half stay with the connection
//! handler that created the session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::ChatMessage;
use crate::types::{ConnectionId, DisplayName};

/// Registered session
///
/// Dropping the last handle for a session closes its outbound queue,
/// which the write loop observes as end of stream.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Connection this session belongs to
    id: ConnectionId,
    name: DisplayName,
    /// Server → Client message queue
    sender: mpsc::Sender<ChatMessage>,
    /// Child of the server-wide shutdown token
    token: CancellationToken,
}

impl SessionHandle {
    pub fn new(
        id: ConnectionId,
        name: DisplayName,
        sender: mpsc::Sender<ChatMessage>,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            name,
            sender,
            token,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Enqueue a message, waiting at most `wait` for queue space
    pub async fn deliver(&self, msg: ChatMessage, wait: Duration) -> Result<(), SendError> {
        self.sender.send_timeout(msg, wait).await.map_err(|e| match e {
            SendTimeoutError::Timeout(_) => SendError::Timeout,
            SendTimeoutError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Cancel the session; its read and write loops exit and the
    /// handler closes the socket
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str, capacity: usize) -> (SessionHandle, mpsc::Receiver<ChatMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = SessionHandle::new(
            ConnectionId::new(),
            DisplayName::parse(name).unwrap(),
            tx,
            CancellationToken::new(),
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn test_deliver_enqueues() {
        let (session, mut rx) = handle("alice", 4);

        session
            .deliver(ChatMessage::notice("hi"), Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().content, "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_times_out_when_full() {
        let (session, _rx) = handle("alice", 1);
        let wait = Duration::from_secs(1);

        session.deliver(ChatMessage::notice("1"), wait).await.unwrap();
        let result = session.deliver(ChatMessage::notice("2"), wait).await;

        assert_eq!(result, Err(SendError::Timeout));
    }

    #[tokio::test]
    async fn test_deliver_to_closed_queue() {
        let (session, rx) = handle("alice", 1);
        drop(rx);

        let result = session
            .deliver(ChatMessage::notice("x"), Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(SendError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_close_cancels_token() {
        let parent = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(1);
        let session = SessionHandle::new(
            ConnectionId::new(),
            DisplayName::parse("bob").unwrap(),
            tx,
            parent.child_token(),
        );

        assert!(!session.is_closed());
        session.close();
        assert!(session.is_closed());
        assert!(!parent.is_cancelled());
    }
}
