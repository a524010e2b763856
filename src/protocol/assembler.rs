//! Frame assembler for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` so the completed body can be split into
//! metadata and payload without copying.
//! Implements a state machine for one connection's single frame:
//! - `AwaitingHeader`: Need at least 8 bytes
//! - `Accumulating`: Header parsed, need `meta_length + data_length` body bytes
//! - `Complete`: Frame handed off, further input is a protocol error
//!
//! # Example
//!
//! ```
//! use render_worker::protocol::{build_frame, FrameAssembler};
//!
//! let bytes = build_frame(b"{}", b"abc").unwrap();
//! let mut assembler = FrameAssembler::new();
//!
//! // Data arrives in chunks from the socket
//! assert!(assembler.push(&bytes[..5]).unwrap().is_none());
//! let frame = assembler.push(&bytes[5..]).unwrap().unwrap();
//!
//! assert_eq!(frame.data(), b"abc");
//! ```

use bytes::BytesMut;

use super::wire_format::{FrameHeader, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::{Result, WorkerError};

/// Initial buffer capacity; the body reservation grows it once the header is known.
const INITIAL_CAPACITY: usize = 8 * 1024;

/// State machine for frame assembly.
#[derive(Debug, Clone)]
enum State {
    /// Fewer than 8 bytes seen so far.
    AwaitingHeader,
    /// Header parsed, waiting for body bytes.
    Accumulating { header: FrameHeader },
    /// Frame already handed off.
    Complete,
}

/// Per-connection buffer that reassembles one frame from arbitrary chunks.
pub struct FrameAssembler {
    /// Accumulated bytes (header first, then body only once the header is consumed).
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Total bytes pushed so far, header included.
    received: usize,
    /// Maximum allowed `meta_length + data_length`.
    max_body_size: u32,
}

impl FrameAssembler {
    /// Create a new assembler with the default body limit (64 MB).
    pub fn new() -> Self {
        Self::with_max_body_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new assembler with a custom body limit.
    pub fn with_max_body_size(max_body_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            state: State::AwaitingHeader,
            received: 0,
            max_body_size,
        }
    }

    /// Push a chunk and check whether the frame is now complete.
    ///
    /// Chunks must be pushed in arrival order. Returns `Ok(None)` while the
    /// frame is still incomplete and `Ok(Some(frame))` exactly once.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` if the declared lengths exceed the body limit
    /// - `Protocol` if called again after the frame was handed off
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Frame>> {
        if matches!(self.state, State::Complete) {
            return Err(WorkerError::Protocol(
                "Frame already complete, connection carries a single request".to_string(),
            ));
        }

        self.buffer.extend_from_slice(chunk);
        self.received += chunk.len();

        self.try_complete()
    }

    fn try_complete(&mut self) -> Result<Option<Frame>> {
        if let State::AwaitingHeader = self.state {
            let Some(header) = FrameHeader::decode(&self.buffer) else {
                tracing::trace!(buffered = self.buffer.len(), "Waiting for frame header");
                return Ok(None);
            };

            header.validate(self.max_body_size)?;

            let _ = self.buffer.split_to(HEADER_SIZE);
            // Bounded by validate() above.
            let body_length = header.body_length() as usize;
            self.buffer
                .reserve(body_length.saturating_sub(self.buffer.len()));

            tracing::trace!(
                meta_length = header.meta_length,
                data_length = header.data_length,
                "Parsed frame header"
            );
            self.state = State::Accumulating { header };
        }

        let State::Accumulating { header } = self.state else {
            return Ok(None);
        };

        let body_length = header.body_length() as usize;
        if self.buffer.len() < body_length {
            tracing::trace!(
                received = self.buffer.len(),
                expected = body_length,
                "Waiting for the next chunk"
            );
            return Ok(None);
        }

        if self.buffer.len() > body_length {
            tracing::warn!(
                extra = self.buffer.len() - body_length,
                "Ignoring bytes past the end of the frame"
            );
        }

        let mut body = self.buffer.split_to(body_length).freeze();
        let meta = body.split_to(header.meta_length as usize);
        self.buffer.clear();
        self.state = State::Complete;

        Ok(Some(Frame::new(header, meta, body)))
    }

    /// Total bytes received so far, header included.
    pub fn bytes_received(&self) -> usize {
        self.received
    }

    /// Declared header, once the first 8 bytes have arrived.
    pub fn header(&self) -> Option<FrameHeader> {
        match self.state {
            State::Accumulating { header } => Some(header),
            _ => None,
        }
    }

    /// Whether the frame has been handed off.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete)
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::AwaitingHeader => "AwaitingHeader",
            State::Accumulating { .. } => "Accumulating",
            State::Complete => "Complete",
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
