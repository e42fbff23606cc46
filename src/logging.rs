use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to install log subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter from `RUST_LOG`, else `default_directive`, else `info`
pub fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Send tracing output to `log_path`, appending.
///
/// The terminal is drawn by the UI, so nothing is written to stdout or stderr.
pub fn init(log_path: &Path, default_directive: &str) -> Result<(), LoggingError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(build_filter(default_directive))
        .with(file_layer)
        .try_init()?;

    tracing::info!(log_file = %log_path.display(), "logging initialized");
    Ok(())
}
