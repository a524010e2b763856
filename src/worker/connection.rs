//! Per-connection handling.
//!
//! One connection carries one request:
//!
//! ```text
//! AwaitingFirstChunk ─► Accumulating ─► Complete ─► Responding ─► Closed
//!         │                  │             │
//!         └──────────────────┴─────────────┴──► Errored ─► Responding ─► Closed
//! ```
//!
//! Protocol, decode and dispatch failures are answered with an `ERROR:`
//! reply. Transport failures abandon the connection and surface as `Err`.
//!
//! A frame rejected from its header alone still has its body in flight. The
//! rest of it is read and discarded after the reply so the socket closes with
//! a FIN rather than a reset that could drop the reply.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::responder::{respond, Reply};
use crate::error::{Result, WorkerError};
use crate::protocol::{Frame, FrameAssembler};
use crate::renderer::RendererRegistry;

/// Read buffer size per socket read.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Most bytes discarded after rejecting an oversized frame.
const MAX_DRAIN_BYTES: u64 = 64 * 1024 * 1024;

/// Longest wait for the peer to finish sending a rejected body.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, nothing read yet.
    AwaitingFirstChunk,
    /// Some bytes read, frame incomplete.
    Accumulating,
    /// Frame assembled.
    Complete,
    /// A failure occurred; an error reply follows.
    Errored,
    /// Writing the reply.
    Responding,
    /// Reply written and write half shut down.
    Closed,
}

impl ConnectionState {
    /// Get the state name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::AwaitingFirstChunk => "AwaitingFirstChunk",
            ConnectionState::Accumulating => "Accumulating",
            ConnectionState::Complete => "Complete",
            ConnectionState::Errored => "Errored",
            ConnectionState::Responding => "Responding",
            ConnectionState::Closed => "Closed",
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        if *self != next {
            tracing::trace!(from = self.as_str(), to = next.as_str(), "Connection state");
            *self = next;
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serve one request on `stream` and close it.
///
/// Returns the final state (`Closed`) once the reply has been written, or the
/// transport error that made the connection unusable.
pub async fn handle_connection<S>(
    mut stream: S,
    registry: &RendererRegistry,
    max_body_size: u32,
) -> Result<ConnectionState>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = ConnectionState::AwaitingFirstChunk;
    tracing::trace!("New connection");

    let frame = read_frame(&mut stream, &mut state, max_body_size).await?;

    let reply = match frame {
        Ok(frame) => {
            state.advance(ConnectionState::Complete);
            tracing::trace!(bytes = frame.wire_len(), "Finished reading frame");
            Reply::from(respond(&frame, registry))
        }
        Err(err) => Reply::Failed(err),
    };

    let mut unread_body = 0;
    if let Reply::Failed(err) = &reply {
        state.advance(ConnectionState::Errored);
        tracing::error!("Request failed: {}", err);
        if let WorkerError::FrameTooLarge { declared, .. } = err {
            unread_body = *declared;
        }
    }

    state.advance(ConnectionState::Responding);
    stream.write_all(&reply.into_bytes()).await?;
    stream.shutdown().await?;
    if unread_body > 0 {
        drain(&mut stream, unread_body.min(MAX_DRAIN_BYTES)).await;
    }
    state.advance(ConnectionState::Closed);
    tracing::trace!("Connection closed");

    Ok(state)
}

/// Read until the frame is complete.
///
/// The outer `Result` is the transport; the inner one is the protocol.
async fn read_frame<S>(
    stream: &mut S,
    state: &mut ConnectionState,
    max_body_size: u32,
) -> Result<Result<Frame>>
where
    S: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::with_max_body_size(max_body_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            tracing::warn!(
                received = assembler.bytes_received(),
                "Peer closed before frame was complete"
            );
            return Ok(Err(WorkerError::IncompleteFrame {
                received: assembler.bytes_received(),
            }));
        }

        state.advance(ConnectionState::Accumulating);
        tracing::trace!(bytes = n, "New data chunk");

        match assembler.push(&buf[..n]) {
            Ok(Some(frame)) => return Ok(Ok(frame)),
            Ok(None) => continue,
            Err(err) => return Ok(Err(err)),
        }
    }
}

/// Discard up to `limit` incoming bytes, stopping early on EOF, error or timeout.
async fn drain<S>(stream: &mut S, limit: u64)
where
    S: AsyncRead + Unpin,
{
    let mut sink = tokio::io::sink();
    let mut body = stream.take(limit);
    match tokio::time::timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut body, &mut sink)).await {
        Ok(Ok(discarded)) => tracing::trace!(discarded, "Discarded rejected body"),
        Ok(Err(e)) => tracing::debug!("Stopped discarding rejected body: {}", e),
        Err(_) => tracing::debug!(limit, "Timed out discarding rejected body"),
    }
}
