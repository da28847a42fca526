//! Tracing subscriber setup.

use crate::paths;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directives, e.g. `CLAUDEBAR_LOG=claudebar=debug`.
pub const LOG_ENV: &str = "CLAUDEBAR_LOG";

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Opens `path` for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Installs the global subscriber and returns the log file in use.
///
/// Logs go to `claudebar.log` in the config directory; `verbose` also
/// mirrors them to stderr. If the file cannot be opened, stderr is used
/// alone.
pub fn init(verbose: bool) -> Option<PathBuf> {
    let opened = paths::log_path().and_then(|path| open_log_file(&path).map(|file| (path, file)));

    match opened {
        Ok((path, file)) => {
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr));
            let installed = tracing_subscriber::registry()
                .with(env_filter())
                .with(file_layer)
                .with(stderr_layer)
                .try_init();
            if installed.is_err() {
                return None;
            }
            tracing::debug!("Logging to {}", path.display());
            Some(path)
        }
        Err(e) => {
            let installed = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            if installed.is_ok() {
                tracing::warn!("File logging disabled: {:#}", e);
            }
            None
        }
    }
}
