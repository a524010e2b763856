//! Renderers shipped with the worker binary.
//!
//! - `url` ([`UrlRenderer`]): `<html>{url}</html>`, useful for health checks
//! - `document` ([`DocumentRenderer`]): an HTML shell that embeds the escaped
//!   hydration payload for client-side pickup

use super::{RenderCapability, RenderRequest, RenderResult, RendererRegistry};

/// Name of [`UrlRenderer`] in the registry.
pub const URL_RENDERER: &str = "url";

/// Name of [`DocumentRenderer`] in the registry.
pub const DOCUMENT_RENDERER: &str = "document";

/// Bind every builtin renderer under its default name.
pub fn install(registry: &mut RendererRegistry) {
    registry.bind(URL_RENDERER, UrlRenderer);
    registry.bind(DOCUMENT_RENDERER, DocumentRenderer::default());
}

/// Echoes the request URL inside an `<html>` element.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlRenderer;

impl RenderCapability for UrlRenderer {
    fn render(&self, request: &RenderRequest) -> RenderResult {
        Ok(format!("<html>{}</html>", request.url))
    }
}

/// Minimal HTML document carrying the hydration payload.
///
/// The payload is emitted verbatim: it is a JSON string literal whose HTML
/// characters were escaped by the host, so `JSON.parse` on the page yields
/// the data JSON text.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    title: String,
    global_name: String,
}

impl DocumentRenderer {
    /// Create a renderer with a page title and the window property to assign.
    pub fn new(title: impl Into<String>, global_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            global_name: global_name.into(),
        }
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new("SSR", "__HYDRATION_DATA__")
    }
}

impl RenderCapability for DocumentRenderer {
    fn render(&self, request: &RenderRequest) -> RenderResult {
        Ok(format!(
            concat!(
                "<!DOCTYPE html>",
                "<html><head><meta charset=\"utf-8\" /><title>{title}</title></head>",
                "<body><div id=\"root\" data-url=\"{url}\"></div>",
                "<script>window.{global} = JSON.parse({data});</script>",
                "</body></html>"
            ),
            title = escape_attr(&self.title),
            url = escape_attr(&request.url),
            global = self.global_name,
            data = request.hydration_data,
        ))
    }
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
