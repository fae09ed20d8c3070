//! Logging initialization and configuration.
//!
//! Logs go to stderr so stdout carries only the context block. When
//! `AIFIX_LOG_DIR` is set, every run additionally writes a log file there.
//!
//! # Configuration
//!
//! The log level can be controlled via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - Show tier selection, invocations and parsed history
//! - `RUST_LOG=info` - Show info and higher level logs
//! - `RUST_LOG=warn` - Show warnings and errors only (default)

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directory for per-run log files.
pub const LOG_DIR_VAR: &str = "AIFIX_LOG_DIR";

/// Initialize the logging system.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the lifetime of the program.
pub fn init_logging() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let file = std::env::var_os(LOG_DIR_VAR)
        .map(PathBuf::from)
        .and_then(|dir| create_log_file(&dir));

    let log_path = file.as_ref().map(|(_, path)| path.clone());
    let (file_layer, guard) = match file {
        Some((log_file, _)) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_path {
        tracing::debug!("Logging initialized - writing to {}", path.display());
    }
    guard
}

/// Create `aifix.<timestamp>.log` in `dir`, e.g. `aifix.2024-12-06-14-30-25.log`.
fn create_log_file(dir: &Path) -> Option<(fs::File, PathBuf)> {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Warning: Failed to create log directory {}: {}", dir.display(), e);
        return None;
    }

    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let log_path = dir.join(format!("aifix.{}.log", timestamp));
    match fs::File::create(&log_path) {
        Ok(file) => Some((file, log_path)),
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {}", e);
            None
        }
    }
}
