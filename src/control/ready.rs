//! Readiness message builder.
//!
//! # Example
//!
//! ```
//! use render_worker::control::build_ready_message;
//!
//! let json = build_ready_message("127.0.0.1:9000".parse().unwrap());
//! assert!(json.contains("\"ready\""));
//! ```

use std::net::SocketAddr;

use serde_json::json;

use super::stdio::write_stdout_line;
use crate::error::Result;

/// Build the readiness line as a JSON string.
pub fn build_ready_message(addr: SocketAddr) -> String {
    let msg = json!({
        "event": "ready",
        "host": addr.ip().to_string(),
        "port": addr.port(),
        "pid": std::process::id(),
    });

    msg.to_string()
}

/// Tell the host the worker is accepting connections.
pub fn announce_ready(addr: SocketAddr) -> Result<()> {
    write_stdout_line(&build_ready_message(addr))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_ready_message_fields() {
        let msg = build_ready_message("127.0.0.1:9123".parse().unwrap());
        let parsed: Value = serde_json::from_str(&msg).unwrap();

        assert_eq!(parsed["event"], "ready");
        assert_eq!(parsed["host"], "127.0.0.1");
        assert_eq!(parsed["port"], 9123);
        assert_eq!(parsed["pid"], std::process::id());
    }

    #[test]
    fn test_ready_message_is_single_line() {
        let msg = build_ready_message("[::1]:80".parse().unwrap());
        assert!(!msg.contains('\n'));
    }
}
