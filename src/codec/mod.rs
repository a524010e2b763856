//! Codec module - decoding of the two frame sections.
//!
//! - [`JsonCodec`] - metadata section to [`Envelope`](crate::protocol::Envelope)
//! - [`HydrationCodec`] - payload section, double JSON encoded in transit
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! The payload text is kept verbatim next to its decoded value so a renderer
//! can embed the escaped form without re-serializing it.
//!
//! # Example
//!
//! ```
//! use render_worker::codec::HydrationCodec;
//! use serde_json::json;
//!
//! let payload = HydrationCodec::encode(&json!({"a": 1})).unwrap();
//! let text = HydrationCodec::text(&payload).unwrap();
//! assert_eq!(HydrationCodec::decode(&text).unwrap(), json!({"a": 1}));
//! ```

mod hydration;
mod json;

pub use hydration::HydrationCodec;
pub use json::JsonCodec;
