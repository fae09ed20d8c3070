//! Shell history reading.
//!
//! Locates the history file for a shell, parses it into an ordered list of
//! commands (oldest first), picks the newest command that is not an
//! invocation of this tool, and cuts the trailing window used as context.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Shell;
use crate::error::{AcquireError, Result};

/// Number of recent commands kept for context.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

const BASH_HISTORY: &str = ".bash_history";
const ZSH_HISTORY: &str = ".zsh_history";
const FISH_HISTORY: &str = ".local/share/fish/fish_history";

/// Resolve the history file for `shell` under `home`.
///
/// Known shells map to their fixed path without checking it exists; a missing
/// file surfaces later as a read failure. Unknown shells fall back to the
/// first existing of the bash and zsh files.
pub fn locate(shell: &Shell, home: &Path) -> Result<PathBuf> {
    match shell {
        Shell::Bash => Ok(home.join(BASH_HISTORY)),
        Shell::Zsh => Ok(home.join(ZSH_HISTORY)),
        Shell::Fish => Ok(home.join(FISH_HISTORY)),
        Shell::Other(name) => {
            let candidates = [home.join(BASH_HISTORY), home.join(ZSH_HISTORY)];
            if let Some(found) = candidates.iter().find(|p| p.is_file()) {
                debug!("Using {} as history for shell '{}'", found.display(), name);
                return Ok(found.clone());
            }
            Err(AcquireError::HistoryUnavailable {
                shell: name.clone(),
                tried: candidates.to_vec(),
            })
        }
    }
}

/// History line format, selected by shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryDialect {
    /// bash and zsh: plain lines, or zsh extended `: <ts>:<duration>;<command>`,
    /// detected per line.
    Posix,
    /// fish: `- cmd: <command>` entries followed by indented metadata.
    Fish,
}

impl HistoryDialect {
    pub fn for_shell(shell: &Shell) -> Self {
        match shell {
            Shell::Fish => HistoryDialect::Fish,
            _ => HistoryDialect::Posix,
        }
    }

    /// Parse history content into commands, oldest first.
    ///
    /// Malformed lines are dropped, never fatal.
    pub fn parse(self, content: &str) -> Vec<String> {
        content
            .lines()
            .filter_map(|line| match self {
                HistoryDialect::Posix => parse_posix_line(line),
                HistoryDialect::Fish => parse_fish_line(line),
            })
            .collect()
    }
}

fn parse_posix_line(line: &str) -> Option<String> {
    let command = if line.starts_with(':') {
        // `: 1700000000:0;ls -la`; a line without `;` has no command
        line.split_once(';')?.1
    } else {
        line
    };
    let command = command.trim();
    if command.is_empty() || is_timestamp_stamp(command) {
        return None;
    }
    Some(command.to_string())
}

/// bash writes `#<unix-ts>` before each entry when HISTTIMEFORMAT is set.
fn is_timestamp_stamp(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_fish_line(line: &str) -> Option<String> {
    if line.starts_with(char::is_whitespace) {
        // when:, paths: and their items
        return None;
    }
    let command = match line.strip_prefix("- cmd:") {
        Some(raw) => unescape_fish(raw.trim()),
        None => line.trim().to_string(),
    };
    if command.is_empty() {
        None
    } else {
        Some(command)
    }
}

fn unescape_fish(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Read and parse the history file at `path`.
///
/// Bytes are decoded lossily so zsh's metafied history never fails the read.
pub fn read(path: &Path, dialect: HistoryDialect) -> Result<Vec<String>> {
    let raw = fs::read(path).map_err(|source| AcquireError::HistoryReadFailure {
        path: path.to_path_buf(),
        source,
    })?;
    let commands = dialect.parse(&String::from_utf8_lossy(&raw));
    debug!("Parsed {} commands from {}", commands.len(), path.display());
    Ok(commands)
}

/// Finds the newest command that is not an invocation of this tool.
#[derive(Clone, Debug)]
pub struct LastCommandResolver {
    self_names: Vec<String>,
}

impl LastCommandResolver {
    pub fn new(self_names: Vec<String>) -> Self {
        Self { self_names }
    }

    pub fn self_names(&self) -> &[String] {
        &self.self_names
    }

    /// A command equal to, or starting with, one of the tool's names.
    pub fn is_self_invocation(&self, command: &str) -> bool {
        self.self_names
            .iter()
            .any(|name| command == name || command.starts_with(name.as_str()))
    }

    /// Index and text of the newest qualifying command, if any.
    pub fn resolve<'a>(&self, commands: &'a [String]) -> Option<(usize, &'a str)> {
        commands
            .iter()
            .enumerate()
            .rev()
            .find(|(_, cmd)| !self.is_self_invocation(cmd))
            .map(|(idx, cmd)| (idx, cmd.as_str()))
    }
}

/// The last `n` commands in chronological order, or all of them if fewer.
pub fn recent(commands: &[String], n: usize) -> &[String] {
    let start = commands.len().saturating_sub(n);
    &commands[start..]
}

/// Context window for `command`: the `n` commands ending at the newest
/// non-self command, minus `command` itself.
///
/// The trailing element is dropped when it is `command`; other exact copies
/// are filtered as well so the context never repeats it.
pub fn window_before(
    commands: &[String],
    resolver: &LastCommandResolver,
    command: &str,
    n: usize,
) -> Vec<String> {
    let end = match resolver.resolve(commands) {
        Some((idx, _)) => idx + 1,
        None => return Vec::new(),
    };
    let mut window = recent(&commands[..end], n).to_vec();
    if window.last().map(String::as_str) == Some(command) {
        window.pop();
    }
    window.retain(|cmd| cmd != command);
    window
}
