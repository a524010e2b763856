//! Hydration codec for the payload section.
//!
//! The payload is JSON encoded twice in transit: the data value is serialized
//! to JSON text, and that text is serialized again as a JSON string literal.
//! The outer layer escapes `<`, `>` and `&` as `\u003c`, `\u003e` and
//! `\u0026` so the literal can be dropped into an HTML `<script>` block as is.
//!
//! The worker never re-serializes the payload text: undoing the outer layer
//! would also undo that escaping.

use std::io;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter};
use serde_json::{Serializer, Value};

use crate::error::{Result, WorkerError};

/// Codec for double-encoded hydration data.
pub struct HydrationCodec;

impl HydrationCodec {
    /// Encode a value into payload bytes (host side).
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        let inner = serde_json::to_string(value)?;
        let mut out = Vec::with_capacity(inner.len() + 2);
        let mut ser = Serializer::with_formatter(&mut out, HtmlSafeFormatter);
        inner.serialize(&mut ser)?;
        Ok(out)
    }

    /// Payload bytes as text, kept verbatim.
    pub fn text(bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| WorkerError::HydrationDecode(format!("invalid UTF-8: {e}")))
    }

    /// Undo both JSON layers of the payload text.
    ///
    /// # Errors
    ///
    /// `HydrationDecode` if the text is not a JSON string literal or the
    /// string it contains is not JSON.
    pub fn decode(text: &str) -> Result<Value> {
        let inner: String = serde_json::from_str(text).map_err(|e| {
            WorkerError::HydrationDecode(format!("outer layer is not a JSON string: {e}"))
        })?;

        serde_json::from_str(&inner)
            .map_err(|e| WorkerError::HydrationDecode(format!("inner layer is not JSON: {e}")))
    }
}

/// Compact JSON with HTML-sensitive characters escaped inside strings.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if !matches!(ch, '<' | '>' | '&') {
                continue;
            }
            if start < idx {
                CompactFormatter.write_string_fragment(writer, &fragment[start..idx])?;
            }
            write!(writer, "\\u{:04x}", ch as u32)?;
            start = idx + ch.len_utf8();
        }

        if start < fragment.len() {
            CompactFormatter.write_string_fragment(writer, &fragment[start..])?;
        }
        Ok(())
    }
}
