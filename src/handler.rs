//! TCP connection handler
//!
//! Drives one client through name negotiation, then runs independent read
//! and write tasks until either side ends, and finally reports the leave to
//! the router. The socket is closed when both tasks have dropped their
//! halves.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{
    ChatMessage, HELP_TEXT, NAME_PROMPT, NAME_TAKEN, UNKNOWN_COMMAND, WELCOME_BANNER,
};
use crate::registry::SessionRegistry;
use crate::router::Event;
use crate::session::SessionHandle;
use crate::types::{ConnectionId, DisplayName};

type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;
type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// Handle a new TCP connection
///
/// Returns once the session is fully closed: both loops have exited and
/// the leave has been sent to the router.
pub async fn handle_connection(
    stream: TcpStream,
    events: mpsc::Sender<Event>,
    registry: SessionRegistry,
    shutdown: CancellationToken,
    config: Arc<ServerConfig>,
) -> Result<(), AppError> {
    let id = ConnectionId::new();
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("Connection {} from {}", id, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(config.max_line_length),
    );
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());

    // Name negotiation
    write_line(&mut sink, NAME_PROMPT, config.write_timeout).await?;

    let Some(raw) = read_name(&mut lines, &shutdown, config.read_timeout).await else {
        debug!("Connection {} closed before sending a name", id);
        return Ok(());
    };

    let name = match DisplayName::parse(&raw) {
        Ok(name) => name,
        Err(e) => {
            info!("Connection {} sent an invalid name: {}", id, e);
            let _ = write_line(&mut sink, &e.to_string(), config.write_timeout).await;
            return Ok(());
        }
    };

    // Early rejection; the router checks again when it registers
    if registry.contains(&name).await {
        info!("Connection {} asked for taken name '{}'", id, name);
        let _ = write_line(&mut sink, NAME_TAKEN, config.write_timeout).await;
        return Ok(());
    }

    let (msg_tx, msg_rx) = mpsc::channel::<ChatMessage>(config.outbound_capacity);
    let token = shutdown.child_token();
    let session = SessionHandle::new(id, name.clone(), msg_tx, token.clone());

    // Register with the router
    let (reply_tx, reply_rx) = oneshot::channel();
    events
        .send(Event::Join {
            session,
            reply: reply_tx,
            sent_at: Local::now(),
        })
        .await
        .map_err(|_| AppError::ChannelSend)?;

    match reply_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(AppError::NameConflict(taken))) => {
            info!("Connection {} asked for taken name '{}'", id, taken);
            let _ = write_line(&mut sink, NAME_TAKEN, config.write_timeout).await;
            return Ok(());
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            debug!("Router stopped before connection {} joined", id);
            return Err(AppError::ChannelSend);
        }
    }

    for line in WELCOME_BANNER {
        if let Err(e) = write_line(&mut sink, line, config.write_timeout).await {
            warn!("Failed to send welcome to '{}': {}", name, e);
            token.cancel();
            break;
        }
    }

    let read_task = tokio::spawn(read_loop(
        lines,
        events.clone(),
        name.clone(),
        token.clone(),
        config.read_timeout,
    ));
    let write_task = tokio::spawn(write_loop(
        sink,
        msg_rx,
        name.clone(),
        token.clone(),
        config.write_timeout,
    ));

    let (read_result, write_result) = tokio::join!(read_task, write_task);
    for result in [read_result, write_result] {
        if let Err(e) = result {
            error!("Session task for '{}' failed: {}", name, e);
        }
    }

    // Closing
    let leave = Event::Leave {
        name: name.clone(),
        sent_at: Local::now(),
    };
    let _ = events.send(leave).await;
    token.cancel();

    info!("Client '{}' disconnected", name);

    Ok(())
}

/// Read the candidate name line
///
/// `None` on EOF, read error, timeout or shutdown.
async fn read_name(
    lines: &mut LineReader,
    shutdown: &CancellationToken,
    idle: Duration,
) -> Option<String> {
    tokio::select! {
        _ = shutdown.cancelled() => None,
        next = timeout(idle, lines.next()) => match next {
            Ok(Some(Ok(line))) => Some(line),
            Ok(Some(Err(e))) => {
                debug!("Failed to read name: {}", e);
                None
            }
            Ok(None) | Err(_) => None,
        },
    }
}

async fn write_line(sink: &mut LineWriter, line: &str, deadline: Duration) -> Result<(), AppError> {
    match timeout(deadline, sink.send(line)).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Io(std::io::ErrorKind::TimedOut.into())),
    }
}

/// Socket → router
///
/// Ends on EOF, read error, idle timeout, `/quit`, or cancellation, and
/// cancels the session token on the way out so the write loop stops too.
async fn read_loop(
    mut lines: LineReader,
    events: mpsc::Sender<Event>,
    name: DisplayName,
    token: CancellationToken,
    idle: Duration,
) {
    loop {
        if token.is_cancelled() {
            break;
        }

        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = timeout(idle, lines.next()) => next,
        };

        let line = match next {
            Ok(Some(Ok(line))) => line,
            Ok(Some(Err(e))) => {
                warn!("Read error for '{}': {}", name, e);
                break;
            }
            Ok(None) => {
                debug!("'{}' closed the connection", name);
                break;
            }
            Err(_) => {
                info!("'{}' idle for {:?}, closing", name, idle);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match Command::parse(line) {
            None => Event::Text {
                from: name.clone(),
                content: line.to_string(),
                sent_at: Local::now(),
            },
            Some(Command::Users) => Event::UserListRequest {
                name: name.clone(),
                sent_at: Local::now(),
            },
            Some(Command::Help) => Event::Notice {
                to: name.clone(),
                content: HELP_TEXT.to_string(),
                sent_at: Local::now(),
            },
            Some(Command::Quit) => {
                debug!("'{}' sent /quit", name);
                break;
            }
            Some(Command::Unknown(cmd)) => {
                debug!("'{}' sent unknown command {}", name, cmd);
                Event::Notice {
                    to: name.clone(),
                    content: UNKNOWN_COMMAND.to_string(),
                    sent_at: Local::now(),
                }
            }
        };

        if events.send(event).await.is_err() {
            debug!("Router closed, ending read task for '{}'", name);
            break;
        }
    }

    token.cancel();
    debug!("Read task ended for '{}'", name);
}

/// Outbound queue → socket
///
/// Ends when the queue is closed (unregistered), a write fails or times
/// out, or the session is cancelled.
async fn write_loop(
    mut sink: LineWriter,
    mut queue: mpsc::Receiver<ChatMessage>,
    name: DisplayName,
    token: CancellationToken,
    deadline: Duration,
) {
    loop {
        if token.is_cancelled() {
            break;
        }

        let msg = tokio::select! {
            _ = token.cancelled() => break,
            msg = queue.recv() => msg,
        };

        let Some(msg) = msg else {
            debug!("Outbound queue closed for '{}'", name);
            break;
        };

        if let Err(e) = write_line(&mut sink, &msg.to_string(), deadline).await {
            warn!("Write error for '{}': {}", name, e);
            break;
        }
    }

    token.cancel();
    let _ = timeout(deadline, sink.get_mut().shutdown()).await;
    debug!("Write task ended for '{}'", name);
}
