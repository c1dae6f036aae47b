//! Line-mode chat client
//!
//! Relays between a server connection and a pair of local streams (stdin
//! and stdout in the binary). Generic over the local side so it can be
//! driven from tests.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AppError;

/// Deadline for sending one line to the server
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Run an interactive session over an established connection
///
/// Prints the server's name prompt, sends the first input line as the
/// name, then relays in both directions. Returns when the server closes
/// the connection, input ends, or `shutdown` is cancelled. After `/quit`
/// is sent, input is no longer read and the client waits for the server
/// to hang up.
pub async fn run_client<I, O>(
    stream: TcpStream,
    input: I,
    output: O,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, write_half) = stream.into_split();
    let mut incoming = FramedRead::new(read_half, LinesCodec::new());
    let mut outgoing = FramedWrite::new(write_half, LinesCodec::new());
    let mut input = FramedRead::new(input, LinesCodec::new());
    let mut output = FramedWrite::new(output, LinesCodec::new());

    let prompt = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        line = incoming.next() => match line {
            Some(line) => line?,
            None => return Err(eof("server closed the connection")),
        },
    };
    output.send(prompt).await?;

    let name = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        line = input.next() => match line {
            Some(line) => line?,
            None => return Err(eof("no name entered")),
        },
    };
    send_line(&mut outgoing, name.trim()).await?;

    let token = shutdown.child_token();
    let reader = tokio::spawn(print_incoming(incoming, output, token.clone()));
    let writer = tokio::spawn(forward_input(input, outgoing, token.clone()));

    let (read_result, write_result) = tokio::join!(reader, writer);
    read_result??;
    write_result??;
    Ok(())
}

fn eof(reason: &str) -> AppError {
    AppError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, reason.to_string()))
}

async fn send_line(sink: &mut FramedWrite<OwnedWriteHalf, LinesCodec>, line: &str) -> Result<(), AppError> {
    match timeout(SEND_TIMEOUT, sink.send(line)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::Io(io::ErrorKind::TimedOut.into())),
    }
}

/// Server → local output
async fn print_incoming<O>(
    mut incoming: FramedRead<OwnedReadHalf, LinesCodec>,
    mut output: FramedWrite<O, LinesCodec>,
    token: CancellationToken,
) -> Result<(), AppError>
where
    O: AsyncWrite + Unpin,
{
    let result = loop {
        let next = tokio::select! {
            _ = token.cancelled() => break Ok(()),
            next = incoming.next() => next,
        };

        match next {
            Some(Ok(line)) => {
                let line = line.trim();
                if !line.is_empty() {
                    if let Err(e) = output.send(line).await {
                        break Err(AppError::from(e));
                    }
                }
            }
            Some(Err(e)) => break Err(AppError::from(e)),
            None => {
                debug!("Server closed the connection");
                break Ok(());
            }
        }
    };

    token.cancel();
    result
}

/// Local input → server
async fn forward_input<I>(
    mut input: FramedRead<I, LinesCodec>,
    mut outgoing: FramedWrite<OwnedWriteHalf, LinesCodec>,
    token: CancellationToken,
) -> Result<(), AppError>
where
    I: AsyncRead + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            next = input.next() => next,
        };

        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                token.cancel();
                return Err(e.into());
            }
            None => {
                token.cancel();
                return Ok(());
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Err(e) = send_line(&mut outgoing, line).await {
            token.cancel();
            return Err(e);
        }

        if line == "/quit" {
            return Ok(());
        }
    }
}
