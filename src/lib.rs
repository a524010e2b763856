//! # render-worker
//!
//! Rendering worker for a host process (typically a web server doing
//! server-side rendering).
//!
//! The host opens a short-lived TCP connection per render, writes one frame
//! and reads the reply until the worker closes the socket.
//!
//! ## Protocol
//!
//! - **Frame**: `[u32 BE meta length][u32 BE data length][meta][data]`
//! - **Meta**: JSON object `{"requestId", "url", "requestRenderer"?}`
//! - **Data**: hydration value, JSON encoded twice (a JSON string literal
//!   holding JSON text)
//! - **Reply**: renderer output verbatim, or `ERROR:<diagnostic>`
//!
//! ## Example
//!
//! ```ignore
//! use render_worker::renderer::RenderRequest;
//! use render_worker::Worker;
//!
//! #[tokio::main]
//! async fn main() {
//!     let worker = Worker::builder()
//!         .renderer("home", |req: &RenderRequest| Ok(format!("<html>{}</html>", req.url)))
//!         .global_renderer("home")
//!         .bind("127.0.0.1:9000".parse().unwrap())
//!         .await
//!         .unwrap();
//!
//!     worker.serve().await.unwrap();
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod renderer;
pub mod transport;
pub mod worker;

pub use client::{RenderClient, RendererChoice};
pub use error::WorkerError;
pub use renderer::{RenderCapability, RenderError, RenderRequest, RendererRegistry};
pub use worker::{Worker, WorkerBuilder};
