//! Process configuration from environment variables.
//!
//! | Variable          | Required | Default     |
//! |-------------------|----------|-------------|
//! | `PORT`            | yes      |             |
//! | `HOST`            | no       | `127.0.0.1` |
//! | `GLOBAL_RENDERER` | no       | none        |
//! | `RENDERERS`       | no       | none        |
//! | `MAX_FRAME_SIZE`  | no       | 64 MB       |
//! | `LOG`             | no       | `normal`    |
//!
//! `LOG` is one of `minimal`, `normal` or `verbose`; other values fall back
//! to `normal` with a warning.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use render_worker::config::WorkerConfig;
//!
//! let env = HashMap::from([("PORT", "9000"), ("GLOBAL_RENDERER", "document")]);
//! let config = WorkerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
//!
//! assert_eq!(config.port, 9000);
//! assert_eq!(config.global_renderer.as_deref(), Some("document"));
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::error::{Result, WorkerError};
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Verbosity selected by `LOG`; `RUST_LOG` overrides it when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Warnings and errors only.
    Minimal,
    /// Lifecycle events, warnings and errors.
    #[default]
    Normal,
    /// Everything down to per-chunk tracing.
    Verbose,
}

impl LogMode {
    /// Default `tracing_subscriber::EnvFilter` directive for this mode.
    pub fn directive(self) -> &'static str {
        match self {
            LogMode::Minimal => "warn",
            LogMode::Normal => "info",
            LogMode::Verbose => "trace",
        }
    }
}

impl FromStr for LogMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(LogMode::Minimal),
            "normal" => Ok(LogMode::Normal),
            "verbose" => Ok(LogMode::Verbose),
            other => Err(WorkerError::Config(format!(
                "LOG must be one of minimal, normal, verbose (got {other:?})"
            ))),
        }
    }
}

/// Settings for the worker binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Renderer used when a request names none.
    pub global_renderer: Option<String>,
    /// Extra renderer names to declare.
    pub renderers: Vec<String>,
    /// Maximum frame body size.
    pub max_frame_size: u32,
    /// Log verbosity.
    pub log: LogMode,
    /// `LOG` value that was not recognised; `log` fell back to `Normal`.
    pub unrecognized_log: Option<String>,
}

impl WorkerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (environment or a test map).
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = get("PORT")
            .ok_or_else(|| WorkerError::Config("PORT is not provided".to_string()))?;
        let port = parse(&port, "PORT")?;

        let host = match get("HOST") {
            Some(host) => parse(&host, "HOST")?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let max_frame_size = match get("MAX_FRAME_SIZE") {
            Some(size) => parse(&size, "MAX_FRAME_SIZE")?,
            None => DEFAULT_MAX_FRAME_SIZE,
        };

        let (log, unrecognized_log) = match get("LOG") {
            Some(mode) => match mode.parse() {
                Ok(log) => (log, None),
                Err(_) => (LogMode::default(), Some(mode)),
            },
            None => (LogMode::default(), None),
        };

        let renderers = get("RENDERERS")
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            global_renderer: get("GLOBAL_RENDERER").map(|name| name.trim().to_string()),
            renderers,
            max_frame_size,
            log,
            unrecognized_log,
        })
    }

    /// Address to bind the listener to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T>(value: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| WorkerError::Config(format!("{key} is invalid ({value:?}): {e}")))
}
