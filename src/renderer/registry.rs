//! Renderer registry for resolving a request's renderer by name.
//!
//! Names can be declared before an implementation is bound to them (for
//! example from the `RENDERERS` setting). Resolution distinguishes an unknown
//! name from a known name with nothing to render it.

use std::collections::HashMap;
use std::sync::Arc;

use super::{RenderCapability, RenderRequest, RenderResult};
use crate::error::{Result, WorkerError};

/// Wrapper that lets a plain function act as a renderer.
pub struct FnRenderer<F>
where
    F: Fn(&RenderRequest) -> RenderResult + Send + Sync + 'static,
{
    render: F,
}

impl<F> FnRenderer<F>
where
    F: Fn(&RenderRequest) -> RenderResult + Send + Sync + 'static,
{
    /// Wrap a render function.
    pub fn new(render: F) -> Self {
        Self { render }
    }
}

impl<F> RenderCapability for FnRenderer<F>
where
    F: Fn(&RenderRequest) -> RenderResult + Send + Sync + 'static,
{
    fn render(&self, request: &RenderRequest) -> RenderResult {
        (self.render)(request)
    }
}

/// Registry mapping renderer names to implementations.
///
/// Immutable once the worker starts; shared by all connections.
#[derive(Default)]
pub struct RendererRegistry {
    /// Renderers by name; `None` marks a declared but unbound name.
    renderers: HashMap<String, Option<Arc<dyn RenderCapability>>>,
    /// Name of the renderer used when a request names none.
    global: Option<String>,
}

impl RendererRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a render function under `name`, replacing any previous binding.
    pub fn register<F>(&mut self, name: &str, render: F)
    where
        F: Fn(&RenderRequest) -> RenderResult + Send + Sync + 'static,
    {
        self.bind(name, FnRenderer::new(render));
    }

    /// Bind a renderer implementation to `name`.
    pub fn bind<R: RenderCapability>(&mut self, name: &str, renderer: R) {
        self.renderers
            .insert(name.to_string(), Some(Arc::new(renderer)));
    }

    /// Declare `name` without binding it. Existing bindings are kept.
    pub fn declare(&mut self, name: &str) {
        self.renderers.entry(name.to_string()).or_insert(None);
    }

    /// Use `name` for requests that don't name a renderer.
    ///
    /// # Errors
    ///
    /// `RendererNotFound` if the name was never registered or declared.
    pub fn set_global(&mut self, name: &str) -> Result<()> {
        if !self.renderers.contains_key(name) {
            return Err(WorkerError::RendererNotFound(name.to_string()));
        }
        self.global = Some(name.to_string());
        Ok(())
    }

    /// Name of the global renderer, if configured.
    pub fn global(&self) -> Option<&str> {
        self.global.as_deref()
    }

    /// Whether `name` is registered or declared.
    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Registered and declared names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Pick the renderer for a request.
    ///
    /// A requested name never falls back to the global renderer.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&dyn RenderCapability> {
        let name = match requested {
            Some(name) => name,
            None => self
                .global
                .as_deref()
                .ok_or(WorkerError::NoRendererConfigured)?,
        };

        match self.renderers.get(name) {
            None => Err(WorkerError::RendererNotFound(name.to_string())),
            Some(None) => Err(WorkerError::RendererMissingRenderMethod(name.to_string())),
            Some(Some(renderer)) => Ok(renderer.as_ref()),
        }
    }
}
