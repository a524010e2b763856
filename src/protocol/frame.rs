//! Frame struct with typed accessors.
//!
//! A complete frame owns its metadata and payload sections as
//! `bytes::Bytes`, split out of one buffer without copying.
//!
//! # Example
//!
//! ```
//! use render_worker::protocol::{build_frame, FrameAssembler};
//!
//! let bytes = build_frame(br#"{"url":"/"}"#, b"\"\\\"1\\\"\"").unwrap();
//! let frame = FrameAssembler::new().push(&bytes).unwrap().unwrap();
//!
//! assert_eq!(frame.meta(), br#"{"url":"/"}"#);
//! ```

use bytes::Bytes;

use super::wire_format::{FrameHeader, HEADER_SIZE};
use crate::error::Result;

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: FrameHeader,
    /// Metadata section, exactly `header.meta_length` bytes.
    pub meta: Bytes,
    /// Payload section, exactly `header.data_length` bytes.
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame from header and sections.
    pub fn new(header: FrameHeader, meta: Bytes, data: Bytes) -> Self {
        debug_assert_eq!(meta.len(), header.meta_length as usize);
        debug_assert_eq!(data.len(), header.data_length as usize);
        Self { header, meta, data }
    }

    /// Metadata bytes.
    #[inline]
    pub fn meta(&self) -> &[u8] {
        &self.meta
    }

    /// Payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total size on the wire, header included.
    #[inline]
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.meta.len() + self.data.len()
    }
}

/// Build a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use render_worker::protocol::build_frame;
///
/// let bytes = build_frame(b"{}", b"abc").unwrap();
/// assert_eq!(&bytes[..8], &[0, 0, 0, 2, 0, 0, 0, 3]);
/// assert_eq!(bytes.len(), 8 + 2 + 3);
/// ```
pub fn build_frame(meta: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let header = FrameHeader::for_sections(meta, data)?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + meta.len() + data.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(meta);
    buf.extend_from_slice(data);
    Ok(buf)
}
