//! Error context gathering.
//!
//! This module holds the facts collected about a failed command (the command
//! itself, its error output, the shell and OS it ran in, and the commands that
//! led up to it) together with the pieces that read them from shell history
//! and bound them for the model prompt.

mod format;
pub mod history;
mod truncate;


use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use history::{HistoryDialect, LastCommandResolver};
pub use truncate::{DEFAULT_MAX_LINES, truncate_error};

/// Sentinel command recorded when the user pasted the error text directly.
pub const MANUAL_COMMAND: &str = "N/A (manual error input)";

/// Shell dialect the failed command ran under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    /// Any other shell, keeping the program name so it can still be invoked.
    Other(String),
}

impl Shell {
    /// Detect the shell from a program name or path such as `$SHELL`.
    pub fn detect(shell: &str) -> Self {
        let name = Path::new(shell.trim())
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = name.strip_suffix(".exe").unwrap_or(&name);
        match name {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "" => Shell::Bash,
            other => Shell::Other(other.to_string()),
        }
    }

    /// Program name used to re-invoke the shell.
    pub fn program(&self) -> &str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::Other(name) => name,
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Everything known about the failure, handed to the model request layer
/// once formatted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub command: String,
    pub error: String,
    pub shell: Shell,
    pub os: String,
    pub exit_code: i32,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Commands run before `command`, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recent_commands: Vec<String>,
}

impl ErrorContext {
    /// Start a context for the given environment, stamped with the current time.
    pub fn new(shell: Shell, os: impl Into<String>) -> Self {
        Self {
            command: String::new(),
            error: String::new(),
            shell,
            os: os.into(),
            exit_code: 0,
            timestamp: chrono::Local::now().to_rfc3339(),
            recent_commands: Vec::new(),
        }
    }
}
