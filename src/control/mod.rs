//! Control module - readiness announcement on stdout.
//!
//! The data plane is TCP; stdout carries only control lines for the host
//! that spawned the worker.
//!
//! # Flow
//!
//! 1. Worker binds its listener (port may be ephemeral)
//! 2. Worker writes `{"event":"ready","port":...,"pid":...}` to stdout
//! 3. Host reads the line and starts connecting
//!
//! Logs go to stderr and are never mixed into stdout.

mod ready;
mod stdio;

pub use ready::{announce_ready, build_ready_message};
pub use stdio::write_stdout_line;
