//! Typed failures of the error-context acquisition engine.
//!
//! Every failure is returned to the caller as-is; nothing here is retried.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcquireError>;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("could not resolve the home directory")]
    HomeDirUnavailable,

    #[error("no history file found for shell '{shell}' (tried: {})", display_paths(.tried))]
    HistoryUnavailable { shell: String, tried: Vec<PathBuf> },

    #[error("failed to read history file {}: {source}", .path.display())]
    HistoryReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no commands found in {} (excluding {})", .path.display(), .self_names.join(", "))]
    NoQualifyingCommand {
        path: PathBuf,
        self_names: Vec<String>,
    },

    #[error("could not read command from hook file {}: {reason}", .path.display())]
    HookFileUnreadable { path: PathBuf, reason: String },

    #[error("re-running '{command}' did not finish within {}s", .timeout.as_secs_f32())]
    ReproductionTimeout { command: String, timeout: Duration },

    #[error("failed to re-run '{command}': {source}")]
    ReproductionFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' succeeded with no output")]
    NoErrorDetected { command: String },
}

impl AcquireError {
    /// Follow-up suggestion to print under the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AcquireError::HomeDirUnavailable
            | AcquireError::HistoryUnavailable { .. }
            | AcquireError::HistoryReadFailure { .. }
            | AcquireError::NoQualifyingCommand { .. } => {
                Some("No recent error detected. Usage: aifix [error message]")
            }
            AcquireError::NoErrorDetected { .. } => Some(SHELL_INTEGRATION_TIP),
            AcquireError::HookFileUnreadable { .. } => {
                Some("The shell hook may be stale; re-source your shell config or pass the error text directly")
            }
            AcquireError::ReproductionTimeout { .. } | AcquireError::ReproductionFailed { .. } => {
                Some("Paste the error text instead: aifix \"<error message>\"")
            }
        }
    }
}

pub const SHELL_INTEGRATION_TIP: &str =
    "Tip: For automatic error detection, run: aifix -init-shell zsh";

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
