//! Wire format encoding and decoding.
//!
//! Every connection carries exactly one frame:
//! ```text
//! ┌────────────┬────────────┬──────────────────┬──────────────────┐
//! │ Meta length│ Data length│ Meta             │ Data             │
//! │ 4 bytes    │ 4 bytes    │ meta length bytes│ data length bytes│
//! │ uint32 BE  │ uint32 BE  │ UTF-8 JSON       │ UTF-8 text       │
//! └────────────┴────────────┴──────────────────┴──────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{Result, WorkerError};

/// Size of one length field in bytes.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Header size in bytes (two length fields, exactly 8).
pub const HEADER_SIZE: usize = 2 * LENGTH_FIELD_SIZE;

/// Default maximum body size (meta + data), 64 MB.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Byte count of the metadata section.
    pub meta_length: u32,
    /// Byte count of the payload section.
    pub data_length: u32,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(meta_length: u32, data_length: u32) -> Self {
        Self {
            meta_length,
            data_length,
        }
    }

    /// Build a header for the given sections.
    ///
    /// Fails if either section does not fit a 32-bit length field.
    pub fn for_sections(meta: &[u8], data: &[u8]) -> Result<Self> {
        let meta_length = u32::try_from(meta.len()).map_err(|_| {
            WorkerError::Protocol(format!("Meta section of {} bytes is too long", meta.len()))
        })?;
        let data_length = u32::try_from(data.len()).map_err(|_| {
            WorkerError::Protocol(format!("Data section of {} bytes is too long", data.len()))
        })?;
        Ok(Self::new(meta_length, data_length))
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use render_worker::protocol::FrameHeader;
    ///
    /// let bytes = FrameHeader::new(2, 258).encode();
    /// assert_eq!(bytes, [0, 0, 0, 2, 0, 0, 1, 2]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..LENGTH_FIELD_SIZE].copy_from_slice(&self.meta_length.to_be_bytes());
        buf[LENGTH_FIELD_SIZE..].copy_from_slice(&self.data_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short. Bytes past the header are ignored.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            meta_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            data_length: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Combined length of meta and data sections.
    ///
    /// Computed in 64 bits so two maximal fields cannot overflow.
    #[inline]
    pub fn body_length(&self) -> u64 {
        u64::from(self.meta_length) + u64::from(self.data_length)
    }

    /// Validate declared lengths against a maximum body size.
    pub fn validate(&self, max_body_size: u32) -> Result<()> {
        let declared = self.body_length();
        if declared > u64::from(max_body_size) {
            return Err(WorkerError::FrameTooLarge {
                declared,
                max: max_body_size,
            });
        }
        Ok(())
    }
}
