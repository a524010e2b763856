//! Request envelope carried in the metadata section.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decoded metadata of a render request.
///
/// Unknown fields are ignored so the host can add correlation data freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Opaque identifier, used for log correlation only.
    #[serde(default)]
    pub request_id: Value,
    /// Logical request target passed to the renderer.
    pub url: String,
    /// Renderer to use; `None` selects the global renderer.
    ///
    /// An empty name decodes as `None`.
    #[serde(
        default,
        deserialize_with = "non_empty_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_renderer: Option<String>,
}

fn non_empty_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|name| !name.is_empty()))
}

impl Envelope {
    /// Create an envelope for the global renderer.
    pub fn new(request_id: impl Into<Value>, url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            request_renderer: None,
        }
    }

    /// Select a named renderer.
    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.request_renderer = Some(renderer.into());
        self
    }

    /// Request id formatted for logs (strings without quotes).
    pub fn request_label(&self) -> String {
        match &self.request_id {
            Value::String(id) => id.clone(),
            Value::Null => "-".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_label() {
        assert_eq!(Envelope::new("r1", "/").request_label(), "r1");
        assert_eq!(Envelope::new(42, "/").request_label(), "42");
        assert_eq!(Envelope::new(Value::Null, "/").request_label(), "-");
    }

    #[test]
    fn test_serializes_camel_case() {
        let envelope = Envelope::new("r1", "/home").with_renderer("blog");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({"requestId": "r1", "url": "/home", "requestRenderer": "blog"})
        );
    }

    #[test]
    fn test_global_renderer_omits_field() {
        let value = serde_json::to_value(Envelope::new("r1", "/")).unwrap();
        assert!(value.get("requestRenderer").is_none());
    }
}
