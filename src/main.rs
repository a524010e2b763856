//! Worker binary.
//!
//! Reads its settings from the environment (see [`render_worker::config`]),
//! serves the builtin renderers plus any declared names, and exits non-zero
//! on startup failure.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use render_worker::config::WorkerConfig;
use render_worker::error::Result;
use render_worker::renderer::builtin;
use render_worker::{control, Worker};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("render-worker: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.directive()));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(value) = &config.unrecognized_log {
        tracing::warn!(value = %value, "Unrecognised LOG value, using normal");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: WorkerConfig) -> Result<()> {
    let mut builder = Worker::builder()
        .configure(builtin::install)
        .max_frame_size(config.max_frame_size);

    for name in &config.renderers {
        builder = builder.declare(name);
    }
    if let Some(name) = &config.global_renderer {
        builder = builder.global_renderer(name.as_str());
    }

    let worker = builder.bind(config.socket_addr()).await?;
    let addr = worker.local_addr()?;
    tracing::info!(
        %addr,
        renderers = ?worker.registry().names(),
        global = worker.registry().global().unwrap_or("<none>"),
        "Worker started"
    );

    control::announce_ready(addr)?;

    worker
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
