//! TCP listener for host connections.
//!
//! # Example
//!
//! ```ignore
//! use render_worker::transport::WorkerListener;
//!
//! let listener = WorkerListener::bind("127.0.0.1:0".parse()?).await?;
//! let (stream, peer) = listener.accept().await?;
//! ```

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;

/// Listener accepting one short-lived connection per render request.
pub struct WorkerListener {
    listener: TcpListener,
}

impl WorkerListener {
    /// Bind to an address. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept a single connection.
    ///
    /// Nagle is disabled: the reply is written once and the socket closed.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
