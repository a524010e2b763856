//! Protocol module - wire format, framing, and the request envelope.
//!
//! This module implements the binary protocol spoken on each connection:
//! - 8-byte header encoding/decoding (two big-endian lengths)
//! - Frame assembler for accumulating partial reads
//! - Frame struct holding the metadata and payload sections

mod assembler;
mod envelope;
mod frame;
mod wire_format;

pub use assembler::FrameAssembler;
pub use envelope::Envelope;
pub use frame::{build_frame, Frame};
pub use wire_format::{FrameHeader, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE, LENGTH_FIELD_SIZE};
