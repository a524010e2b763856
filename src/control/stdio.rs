//! Stdout writes for the control channel.
//!
//! # Important
//!
//! - **stdout**: control lines only (one JSON object per line)
//! - **stderr**: logs (not parsed by the host)
//! - **Never use `println!`**: It may add `\r\n` on Windows

use std::io::Write;

/// Write a line to stdout.
///
/// Writes the string followed by a single `\n` and flushes, so the host sees
/// the complete line immediately.
///
/// # Errors
///
/// Returns IO error if write or flush fails.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}
