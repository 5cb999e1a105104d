//! Tracing setup: stderr plus a plain-text log file in the app data dir.
//!
//! The desktop build has no console on Windows, so the file is where diagnostics end up.
//! `RUST_LOG` overrides the configured level.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;
use crate::paths;

pub fn init(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let log_file = paths::get_log_file().and_then(|path| {
        open_log_file(&path)
            .map(|file| (path.clone(), file))
            .map_err(|e| format!("{}: {e}", path.display()))
    });

    let (file_layer, log_target) = match log_file {
        Ok((path, file)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Ok(path),
        ),
        Err(e) => (None, Err(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    match log_target {
        Ok(path) => debug!(path = %path.display(), "Logging to file"),
        Err(e) => warn!(error = %e, "Log file unavailable, logging to stderr only"),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
