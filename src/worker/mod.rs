//! Worker builder and accept loop.
//!
//! The [`WorkerBuilder`] provides a fluent API for registering renderers and
//! limits. The [`Worker`] manages the lifecycle:
//! 1. Bind the TCP listener
//! 2. Accept host connections
//! 3. Spawn one task per connection: read one frame, render, reply, close
//!
//! # Example
//!
//! ```ignore
//! use render_worker::renderer::RenderRequest;
//! use render_worker::Worker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = Worker::builder()
//!         .renderer("home", |req: &RenderRequest| Ok(format!("<html>{}</html>", req.url)))
//!         .global_renderer("home")
//!         .bind("127.0.0.1:9000".parse()?)
//!         .await?;
//!
//!     worker.serve().await?;
//!     Ok(())
//! }
//! ```

mod connection;
mod responder;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;
use crate::renderer::{RenderCapability, RenderRequest, RenderResult, RendererRegistry};
use crate::transport::WorkerListener;

pub use connection::{handle_connection, ConnectionState};
pub use responder::{invoke, respond, Reply, ERROR_PREFIX};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// doesn't spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Builder for configuring and creating a worker.
pub struct WorkerBuilder {
    registry: RendererRegistry,
    global_renderer: Option<String>,
    max_frame_size: u32,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new() -> Self {
        Self {
            registry: RendererRegistry::new(),
            global_renderer: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Register a render function under `name`.
    pub fn renderer<F>(mut self, name: &str, render: F) -> Self
    where
        F: Fn(&RenderRequest) -> RenderResult + Send + Sync + 'static,
    {
        self.registry.register(name, render);
        self
    }

    /// Bind a renderer implementation under `name`.
    pub fn renderer_impl<R: RenderCapability>(mut self, name: &str, renderer: R) -> Self {
        self.registry.bind(name, renderer);
        self
    }

    /// Declare a renderer name without an implementation.
    ///
    /// Requests for it are answered with a missing-render-method error.
    pub fn declare(mut self, name: &str) -> Self {
        self.registry.declare(name);
        self
    }

    /// Run a setup step against the registry, e.g. `builtin::install`.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut RendererRegistry),
    {
        configure(&mut self.registry);
        self
    }

    /// Renderer used for requests that don't name one.
    ///
    /// Checked against the registry in [`bind`](Self::bind).
    pub fn global_renderer(mut self, name: impl Into<String>) -> Self {
        self.global_renderer = Some(name.into());
        self
    }

    /// Maximum `meta_length + data_length` accepted per frame.
    ///
    /// Default: 64 MB
    pub fn max_frame_size(mut self, limit: u32) -> Self {
        self.max_frame_size = limit;
        self
    }

    /// Finish configuration without binding a socket.
    ///
    /// # Errors
    ///
    /// `RendererNotFound` if the global renderer was never registered.
    pub fn build_registry(mut self) -> Result<(RendererRegistry, u32)> {
        if let Some(name) = self.global_renderer.take() {
            self.registry.set_global(&name)?;
        }
        Ok((self.registry, self.max_frame_size))
    }

    /// Build the worker and bind its listener.
    pub async fn bind(self, addr: SocketAddr) -> Result<Worker> {
        let (registry, max_frame_size) = self.build_registry()?;
        let listener = WorkerListener::bind(addr).await?;

        Ok(Worker {
            listener,
            shared: Arc::new(Shared {
                registry,
                max_frame_size,
            }),
        })
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared read-only by every connection task.
struct Shared {
    registry: RendererRegistry,
    max_frame_size: u32,
}

/// A bound worker, ready to serve.
pub struct Worker {
    listener: WorkerListener,
    shared: Arc<Shared>,
}

impl Worker {
    /// Create a new worker builder.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Registry used to resolve renderers.
    pub fn registry(&self) -> &RendererRegistry {
        &self.shared.registry
    }

    /// Accept connections until the process ends.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "Ready to accept connections");

        let mut next_id: u64 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(%addr, "Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!("Accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    next_id += 1;
                    let span = tracing::debug_span!(
                        "connection",
                        id = next_id,
                        %peer,
                        request_id = tracing::field::Empty,
                    );
                    let shared = Arc::clone(&self.shared);

                    tokio::spawn(
                        async move {
                            if let Err(e) =
                                handle_connection(stream, &shared.registry, shared.max_frame_size)
                                    .await
                            {
                                tracing::warn!("Connection error: {}", e);
                            }
                        }
                        .instrument(span),
                    );
                }
            }
        }
    }
}
