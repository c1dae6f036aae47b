//! Message router actor
//!
//! The single serialization point for every state-changing event. Join,
//! leave and chat events arrive on one mpsc channel and are processed one
//! at a time, so registry mutations and the notices that describe them
//! are never observed out of order.

use std::time::Duration;

use chrono::{DateTime, Local};
use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AppError, SendError};
use crate::message::ChatMessage;
use crate::registry::SessionRegistry;
use crate::session::SessionHandle;
use crate::types::DisplayName;

/// Events sent from connection handlers to the router
///
/// `sent_at` is the event's creation time; every message the event
/// produces carries that timestamp.
#[derive(Debug)]
pub enum Event {
    /// Register a session; the outcome is reported on `reply`
    Join {
        session: SessionHandle,
        reply: oneshot::Sender<Result<(), AppError>>,
        sent_at: DateTime<Local>,
    },
    /// Session finished; unregister and announce
    Leave {
        name: DisplayName,
        sent_at: DateTime<Local>,
    },
    /// Chat line to broadcast to everyone, sender included
    Text {
        from: DisplayName,
        content: String,
        sent_at: DateTime<Local>,
    },
    /// Private user list for `name`
    UserListRequest {
        name: DisplayName,
        sent_at: DateTime<Local>,
    },
    /// Private notice for `to` (help text, unknown command)
    Notice {
        to: DisplayName,
        content: String,
        sent_at: DateTime<Local>,
    },
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Delivery {
    /// Recipients a send was attempted for
    pub attempted: usize,
    /// Recipients whose queue accepted the message
    pub delivered: usize,
    /// Recipients skipped because their queue stayed full or was closed
    pub dropped: usize,
}

/// The router actor
///
/// Sole writer of the session registry.
pub struct Router {
    registry: SessionRegistry,
    /// Event receiver channel
    events: mpsc::Receiver<Event>,
    shutdown: CancellationToken,
    /// Per-recipient wait before a message is dropped
    fanout_timeout: Duration,
}

impl Router {
    pub fn new(
        registry: SessionRegistry,
        events: mpsc::Receiver<Event>,
        shutdown: CancellationToken,
        fanout_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            events,
            shutdown,
            fanout_timeout,
        }
    }

    /// Run the event loop
    ///
    /// Processes events until the shutdown token fires or every sender is
    /// dropped, then closes all registered sessions.
    pub async fn run(mut self) {
        info!("Router started");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Router received shutdown signal");
                    break;
                }
                event = self.events.recv() => event,
            };

            match event {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }

        // Stop accepting events. Buffered ones are dropped, which also
        // resolves any pending join replies with an error.
        self.events.close();
        let mut abandoned = 0;
        while self.events.try_recv().is_ok() {
            abandoned += 1;
        }
        if abandoned > 0 {
            debug!("Router abandoned {} buffered events", abandoned);
        }

        let closed = self.registry.close_all().await;
        info!("Router stopped, closed {} sessions", closed);
    }

    /// Process a single event
    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Join {
                session,
                reply,
                sent_at,
            } => self.handle_join(session, reply, sent_at).await,
            Event::Leave { name, sent_at } => self.handle_leave(name, sent_at).await,
            Event::Text {
                from,
                content,
                sent_at,
            } => {
                self.broadcast(ChatMessage::text(from.as_str(), content, sent_at))
                    .await;
            }
            Event::UserListRequest { name, sent_at } => {
                self.send_user_list(&name, sent_at).await;
            }
            Event::Notice {
                to,
                content,
                sent_at,
            } => {
                self.send_private(&to, ChatMessage::notice_at(content, sent_at))
                    .await;
            }
        }
    }

    async fn handle_join(
        &mut self,
        session: SessionHandle,
        reply: oneshot::Sender<Result<(), AppError>>,
        sent_at: DateTime<Local>,
    ) {
        let name = session.name().clone();
        let id = session.id();

        if let Err(e) = self.registry.register(session).await {
            warn!("Client {} rejected: {}", id, e);
            let _ = reply.send(Err(e));
            return;
        }

        info!(
            "Client {} joined as '{}'. Online: {}",
            id,
            name,
            self.registry.len().await
        );

        self.broadcast(ChatMessage::notice_at(format!("{} joined", name), sent_at))
            .await;
        self.send_user_list(&name, sent_at).await;

        if reply.send(Ok(())).is_err() {
            // handler went away while waiting; its Leave never comes
            debug!("Join reply for '{}' not received, unregistering", name);
            self.handle_leave(name, Local::now()).await;
        }
    }

    async fn handle_leave(&mut self, name: DisplayName, sent_at: DateTime<Local>) {
        if !self.registry.unregister(&name).await {
            debug!("Leave for unregistered name '{}'", name);
            return;
        }

        info!(
            "Client '{}' left. Online: {}",
            name,
            self.registry.len().await
        );

        self.broadcast(ChatMessage::notice_at(format!("{} left", name), sent_at))
            .await;
    }

    async fn send_user_list(&self, name: &DisplayName, sent_at: DateTime<Local>) {
        let users = self.registry.snapshot().await;
        let msg = ChatMessage::notice_at(format!("Online: {}", users.join(", ")), sent_at);
        self.send_private(name, msg).await;
    }

    async fn send_private(&self, name: &DisplayName, msg: ChatMessage) {
        let Some(session) = self.registry.get(name).await else {
            debug!("Private message for unregistered '{}' dropped", name);
            return;
        };
        self.deliver(&session, msg).await;
    }

    /// Fan a message out to every registered session
    ///
    /// Each recipient gets its own bounded wait; a full queue drops the
    /// message for that recipient only.
    async fn broadcast(&self, msg: ChatMessage) -> Delivery {
        let recipients = self.registry.recipients().await;
        let attempts = recipients
            .iter()
            .map(|session| self.deliver(session, msg.clone()));
        let results = join_all(attempts).await;

        let delivered = results.iter().filter(|ok| **ok).count();
        Delivery {
            attempted: results.len(),
            delivered,
            dropped: results.len() - delivered,
        }
    }

    async fn deliver(&self, session: &SessionHandle, msg: ChatMessage) -> bool {
        match session.deliver(msg, self.fanout_timeout).await {
            Ok(()) => true,
            Err(SendError::Timeout) => {
                warn!(
                    "Failed to deliver message to '{}': queue full",
                    session.name()
                );
                false
            }
            Err(SendError::ChannelClosed) => {
                debug!("Queue for '{}' already closed", session.name());
                false
            }
        }
    }
}
