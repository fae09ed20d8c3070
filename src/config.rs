//! Engine configuration.
//!
//! All process state the engine depends on (environment variables, home
//! directory, detected shell) is read once at startup into [`EngineConfig`]
//! and passed in explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::context::history::DEFAULT_WINDOW_SIZE;
use crate::context::{DEFAULT_MAX_LINES, Shell};
use crate::shell::DEFAULT_TIMEOUT;

/// Environment variable naming the file that holds the last failed command.
pub const CMD_FILE_VAR: &str = "AIFIX_CMD_FILE";
/// Environment variable holding the last exit code as a decimal string.
pub const LAST_EXIT_VAR: &str = "AIFIX_LAST_EXIT";
/// Comma-separated override for the names this tool is invoked under.
pub const SELF_NAMES_VAR: &str = "AIFIX_SELF_NAMES";

pub const DEFAULT_SELF_NAMES: &[&str] = &["aifix", "fix"];

/// Signal left behind by the shell integration hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookSignal {
    pub command_file: PathBuf,
    /// Raw value of the exit code variable, if set.
    pub last_exit: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub shell: Shell,
    pub os: String,
    /// `None` when the home directory could not be resolved.
    pub home_dir: Option<PathBuf>,
    pub hook: Option<HookSignal>,
    /// Names whose invocations are skipped when reading history.
    pub self_names: Vec<String>,
    pub window_size: usize,
    pub max_error_lines: usize,
    pub reproduce_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shell: Shell::Bash,
            os: std::env::consts::OS.to_string(),
            home_dir: None,
            hook: None,
            self_names: DEFAULT_SELF_NAMES.iter().map(|s| s.to_string()).collect(),
            window_size: DEFAULT_WINDOW_SIZE,
            max_error_lines: DEFAULT_MAX_LINES,
            reproduce_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Build the configuration from the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Build the configuration from a variable lookup, for callers that
    /// do not want to read the process environment.
    pub fn from_vars<F>(var: F, home_dir: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let os = std::env::consts::OS.to_string();
        let shell = if os == "windows" {
            Shell::Other("cmd".to_string())
        } else {
            var("SHELL").map(|s| Shell::detect(&s)).unwrap_or(Shell::Bash)
        };

        let hook = var(CMD_FILE_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(|path| HookSignal {
                command_file: PathBuf::from(path),
                last_exit: var(LAST_EXIT_VAR),
            });

        let self_names = var(SELF_NAMES_VAR)
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| DEFAULT_SELF_NAMES.iter().map(|s| s.to_string()).collect());

        Self {
            shell,
            os,
            home_dir,
            hook,
            self_names,
            ..Self::default()
        }
    }
}
