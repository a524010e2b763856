//! Error types for render-worker.

use thiserror::Error;

/// Main error type for all worker and client operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// I/O error on the connection or listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error outside of request decoding.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (frame reused, lengths out of range, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Declared frame body is larger than the configured maximum.
    #[error("Frame body of {declared} bytes exceeds maximum {max}")]
    FrameTooLarge { declared: u64, max: u32 },

    /// Peer stopped writing before the declared frame arrived.
    #[error("Connection closed before frame was complete ({received} bytes received)")]
    IncompleteFrame { received: usize },

    /// Metadata section is not valid UTF-8 JSON describing an envelope.
    #[error("Failed to decode envelope: {0}")]
    EnvelopeDecode(String),

    /// Payload section failed UTF-8 or one of the two JSON layers.
    #[error("Failed to decode hydration data: {0}")]
    HydrationDecode(String),

    /// The request named a renderer that is not registered.
    #[error("Renderer not found: {0}")]
    RendererNotFound(String),

    /// No renderer requested and no global renderer configured.
    #[error("Renderer is not provided: request did not name one and no global renderer is configured")]
    NoRendererConfigured,

    /// Renderer name is declared but nothing implements its render method.
    #[error("Renderer {0} does not define a render method")]
    RendererMissingRenderMethod(String),

    /// The renderer itself failed.
    #[error("Exception during rendering: {0}")]
    RenderInvocation(String),

    /// The worker answered with an `ERROR:` reply (client side).
    #[error("Worker reported an error: {0}")]
    RenderFailed(String),

    /// Invalid process configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using WorkerError.
pub type Result<T> = std::result::Result<T, WorkerError>;
