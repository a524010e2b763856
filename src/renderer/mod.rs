//! Renderer module - pluggable rendering capabilities.
//!
//! Provides:
//! - [`RenderCapability`] - the one operation a renderer implements
//! - [`RendererRegistry`] - maps renderer names to implementations, with an
//!   optional global renderer used when a request names none
//! - [`builtin`] - renderers shipped with the worker binary
//!
//! # Example
//!
//! ```
//! use render_worker::renderer::{RenderCapability, RenderRequest, RendererRegistry};
//! use serde_json::json;
//!
//! let mut registry = RendererRegistry::new();
//! registry.register("home", |req: &RenderRequest| Ok(format!("<html>{}</html>", req.url)));
//! registry.set_global("home").unwrap();
//!
//! let request = RenderRequest::new("/home", json!({"a": 1}), r#""{\"a\":1}""#);
//! let html = registry.resolve(None).unwrap().render(&request).unwrap();
//! assert_eq!(html, "<html>/home</html>");
//! ```

pub mod builtin;
mod registry;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use registry::{FnRenderer, RendererRegistry};

/// Input handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Logical request target from the envelope.
    pub url: String,
    /// Fully decoded hydration value.
    pub json_data: Value,
    /// Hydration payload text exactly as received (still escaped).
    pub hydration_data: String,
}

impl RenderRequest {
    /// Create a render request.
    pub fn new(
        url: impl Into<String>,
        json_data: Value,
        hydration_data: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            json_data,
            hydration_data: hydration_data.into(),
        }
    }
}

/// Failure reported by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Create a render error with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for render operations.
pub type RenderResult = std::result::Result<String, RenderError>;

/// A rendering capability.
///
/// Invoked synchronously once per request; implementations must be shareable
/// across connection tasks.
pub trait RenderCapability: Send + Sync + 'static {
    /// Render the request into the response body.
    fn render(&self, request: &RenderRequest) -> RenderResult;
}
