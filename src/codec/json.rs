//! JSON codec for the metadata section.
//!
//! The metadata comes from the controlling host and is trusted, so it is
//! parsed in one pass. It must be a JSON object: `serde_json` would otherwise
//! accept a positional array for a struct.

use serde_json::Value;

use crate::error::{Result, WorkerError};
use crate::protocol::Envelope;

/// JSON codec for request envelopes.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode an envelope to metadata bytes.
    pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(envelope)?)
    }

    /// Decode metadata bytes to an envelope.
    ///
    /// # Errors
    ///
    /// `EnvelopeDecode` if the bytes are not UTF-8, not JSON, not an object,
    /// or lack a string `url`.
    pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| WorkerError::EnvelopeDecode(format!("invalid UTF-8: {e}")))?;

        let value: Value = serde_json::from_str(text)
            .map_err(|e| WorkerError::EnvelopeDecode(format!("invalid JSON: {e}")))?;

        if !value.is_object() {
            return Err(WorkerError::EnvelopeDecode(format!(
                "expected a JSON object, got {}",
                kind(&value)
            )));
        }

        serde_json::from_value(value).map_err(|e| WorkerError::EnvelopeDecode(e.to_string()))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
