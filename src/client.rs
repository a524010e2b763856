//! Host-side client for talking to a running worker.
//!
//! Each [`RenderClient::render`] call opens a fresh connection, writes one
//! frame and reads the reply until the worker closes the socket.
//!
//! # Example
//!
//! ```ignore
//! use render_worker::client::{RenderClient, RendererChoice};
//!
//! let client = RenderClient::new("127.0.0.1:9000".parse()?).with_global_renderer(true);
//! let html = client
//!     .render("/home", &serde_json::json!({"a": 1}), RendererChoice::Global)
//!     .await?;
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::codec::{HydrationCodec, JsonCodec};
use crate::error::{Result, WorkerError};
use crate::protocol::{build_frame, Envelope};
use crate::worker::ERROR_PREFIX;

/// Default number of connection attempts while the worker starts up.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;

/// Which renderer the worker should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererChoice {
    /// The worker's global renderer.
    Global,
    /// A renderer registered under this name.
    Named(String),
}

/// Client for a single worker address.
#[derive(Debug, Clone)]
pub struct RenderClient {
    addr: SocketAddr,
    has_global_renderer: bool,
    connect_attempts: u32,
}

impl RenderClient {
    /// Create a client for the worker at `addr`.
    ///
    /// Assumes the worker has no global renderer until told otherwise.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            has_global_renderer: false,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }

    /// Whether the worker was started with a global renderer.
    pub fn with_global_renderer(mut self, has_global_renderer: bool) -> Self {
        self.has_global_renderer = has_global_renderer;
        self
    }

    /// Number of attempts on `ConnectionRefused` before giving up.
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts.max(1);
        self
    }

    /// Connect to the worker, retrying while it refuses connections.
    ///
    /// Attempt `n` waits `n * 3` ms first. Other errors fail immediately.
    pub async fn connect(&self) -> Result<TcpStream> {
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                let delay = Duration::from_millis(u64::from(attempt) * 3);
                tracing::trace!(attempt, ?delay, "Retrying connection to worker");
                tokio::time::sleep(delay).await;
            }

            match TcpStream::connect(self.addr).await {
                Ok(stream) => {
                    tracing::trace!(addr = %self.addr, "Connected to worker");
                    return Ok(stream);
                }
                Err(e)
                    if e.kind() == io::ErrorKind::ConnectionRefused
                        && attempt < self.connect_attempts =>
                {
                    tracing::trace!(attempt, "Worker refused connection");
                    attempt += 1;
                }
                Err(e) => return Err(WorkerError::Io(e)),
            }
        }
    }

    /// Render `url` with `data` as hydration data.
    ///
    /// # Errors
    ///
    /// - `NoRendererConfigured` if `Global` is requested but the worker has none
    /// - `RenderFailed` with the worker's diagnostic on an `ERROR:` reply
    /// - `Io` on connection failures
    pub async fn render<D>(&self, url: &str, data: &D, renderer: RendererChoice) -> Result<String>
    where
        D: Serialize + ?Sized,
    {
        let frame = self.build_request(url, data, renderer)?;
        let mut stream = self.connect().await?;

        if let Err(e) = stream.write_all(&frame).await {
            // The worker may reject a frame from its header and close early;
            // its reply is still readable.
            if !matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
            ) {
                return Err(WorkerError::Io(e));
            }
            tracing::debug!("Worker stopped reading the request: {}", e);

            let mut reply = Vec::new();
            let _ = stream.read_to_end(&mut reply).await;
            if reply.is_empty() {
                return Err(WorkerError::Io(e));
            }
            return parse_reply(reply);
        }

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;

        parse_reply(reply)
    }

    /// Encode the frame for one render request.
    pub fn build_request<D>(&self, url: &str, data: &D, renderer: RendererChoice) -> Result<Vec<u8>>
    where
        D: Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4();
        let mut envelope = Envelope::new(Value::String(request_id.to_string()), url);
        match renderer {
            RendererChoice::Global if !self.has_global_renderer => {
                return Err(WorkerError::NoRendererConfigured);
            }
            RendererChoice::Global => {}
            RendererChoice::Named(name) => envelope = envelope.with_renderer(name),
        }
        tracing::trace!(%request_id, url, "Building render request");

        let meta = JsonCodec::encode_envelope(&envelope)?;
        let data = HydrationCodec::encode(data)?;
        build_frame(&meta, &data)
    }
}

/// Split a worker reply into output or error.
pub fn parse_reply(reply: Vec<u8>) -> Result<String> {
    let reply = String::from_utf8(reply)
        .map_err(|e| WorkerError::Protocol(format!("Reply is not valid UTF-8: {e}")))?;

    match reply.strip_prefix(ERROR_PREFIX) {
        Some(detail) => Err(WorkerError::RenderFailed(detail.to_string())),
        None => Ok(reply),
    }
}
