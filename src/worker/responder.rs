//! Turns a complete frame into the bytes written back to the host.
//!
//! Decoding order: envelope, hydration text, hydration value, renderer
//! resolution, render call. The first failure wins and becomes an
//! `ERROR:` reply.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::codec::{HydrationCodec, JsonCodec};
use crate::error::{Result, WorkerError};
use crate::protocol::Frame;
use crate::renderer::{RenderCapability, RenderRequest, RendererRegistry};

/// Marker that starts every error reply.
pub const ERROR_PREFIX: &str = "ERROR:";

/// Outcome of one request, written to the connection exactly once.
#[derive(Debug)]
pub enum Reply {
    /// Renderer output, sent verbatim.
    Rendered(String),
    /// Any failure before or during rendering.
    Failed(WorkerError),
}

impl Reply {
    /// Whether this is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Failed(_))
    }

    /// Bytes to write to the connection.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Reply::Rendered(output) => output.into_bytes(),
            Reply::Failed(err) => format!("{ERROR_PREFIX}{err}").into_bytes(),
        }
    }
}

impl From<Result<String>> for Reply {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(output) => Reply::Rendered(output),
            Err(err) => Reply::Failed(err),
        }
    }
}

/// Decode a frame, resolve its renderer and render it.
pub fn respond(frame: &Frame, registry: &RendererRegistry) -> Result<String> {
    let envelope = JsonCodec::decode_envelope(frame.meta())?;
    tracing::Span::current().record("request_id", envelope.request_label().as_str());
    tracing::debug!(
        url = %envelope.url,
        renderer = envelope.request_renderer.as_deref().unwrap_or("<global>"),
        "Decoded envelope"
    );

    let hydration_data = HydrationCodec::text(frame.data())?;
    let json_data = HydrationCodec::decode(&hydration_data)?;

    let renderer = registry.resolve(envelope.request_renderer.as_deref())?;

    let request = RenderRequest {
        url: envelope.url,
        json_data,
        hydration_data,
    };
    invoke(renderer, &request)
}

/// Call the renderer, turning both errors and panics into `RenderInvocation`.
pub fn invoke(renderer: &dyn RenderCapability, request: &RenderRequest) -> Result<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(request))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(WorkerError::RenderInvocation(err.to_string())),
        Err(payload) => Err(WorkerError::RenderInvocation(format!(
            "renderer panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, FrameAssembler};
    use crate::renderer::RenderError;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const HOME_META: &[u8] = br#"{"requestId":"r1","url":"/home"}"#;
    const HOME_DATA: &[u8] = br#""\"{\\\"a\\\":1}\"""#;

    fn frame(meta: &[u8], data: &[u8]) -> Frame {
        FrameAssembler::new()
            .push(&build_frame(meta, data).unwrap())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_home_scenario() {
        let seen = Arc::new(Mutex::new(None));
        let seen_by_renderer = Arc::clone(&seen);

        let mut registry = RendererRegistry::new();
        registry.register("home", move |req: &RenderRequest| {
            *seen_by_renderer.lock().unwrap() = Some(req.clone());
            Ok(format!("<html>{}</html>", req.url))
        });
        registry.set_global("home").unwrap();

        let reply = Reply::from(respond(&frame(HOME_META, HOME_DATA), &registry));

        assert_eq!(reply.into_bytes(), b"<html>/home</html>");
        let request = seen.lock().unwrap().take().unwrap();
        assert_eq!(request.json_data, json!({"a": 1}));
        assert_eq!(request.hydration_data.as_bytes(), HOME_DATA);
        assert_eq!(request.url, "/home");
    }

    #[test]
    fn test_renderer_error_becomes_error_reply() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| {
            Err(RenderError::new("template exploded"))
        });
        registry.set_global("home").unwrap();

        let reply = Reply::from(respond(&frame(HOME_META, HOME_DATA), &registry));

        assert!(reply.is_error());
        let text = String::from_utf8(reply.into_bytes()).unwrap();
        assert!(text.starts_with("ERROR:"));
        assert!(text.contains("template exploded"));
    }

    #[test]
    fn test_renderer_panic_is_caught() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| panic!("boom"));
        registry.set_global("home").unwrap();

        let err = respond(&frame(HOME_META, HOME_DATA), &registry).unwrap_err();

        assert!(matches!(err, WorkerError::RenderInvocation(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn test_malformed_meta() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| Ok("unreachable".to_string()));
        registry.set_global("home").unwrap();

        for meta in [&b"not json"[..], &[0xFF, 0xFE][..], &b"[1,2]"[..]] {
            let err = respond(&frame(meta, HOME_DATA), &registry).unwrap_err();
            assert!(matches!(err, WorkerError::EnvelopeDecode(_)));
        }
    }

    #[test]
    fn test_bad_hydration() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| Ok("unreachable".to_string()));
        registry.set_global("home").unwrap();

        let err = respond(&frame(HOME_META, br#"{"a":1}"#), &registry).unwrap_err();
        assert!(matches!(err, WorkerError::HydrationDecode(_)));
    }

    #[test]
    fn test_unknown_requested_renderer() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| Ok("global".to_string()));
        registry.set_global("home").unwrap();

        let meta = br#"{"requestId":"r2","url":"/","requestRenderer":"missing"}"#;
        let err = respond(&frame(meta, HOME_DATA), &registry).unwrap_err();

        assert!(matches!(err, WorkerError::RendererNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn test_empty_requested_renderer_uses_global() {
        let mut registry = RendererRegistry::new();
        registry.register("home", |_req: &RenderRequest| Ok("global".to_string()));
        registry.set_global("home").unwrap();

        let meta = br#"{"requestId":"r3","url":"/","requestRenderer":""}"#;
        assert_eq!(respond(&frame(meta, HOME_DATA), &registry).unwrap(), "global");
    }

    #[test]
    fn test_no_renderer_configured() {
        let registry = RendererRegistry::new();
        let err = respond(&frame(HOME_META, HOME_DATA), &registry).unwrap_err();
        assert!(matches!(err, WorkerError::NoRendererConfigured));
    }

    #[test]
    fn test_error_reply_format() {
        let reply = Reply::Failed(WorkerError::NoRendererConfigured);
        let text = String::from_utf8(reply.into_bytes()).unwrap();
        assert_eq!(
            text,
            format!("ERROR:{}", WorkerError::NoRendererConfigured)
        );
    }
}
