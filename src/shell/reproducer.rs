//! Best-effort re-derivation of a command's error output.
//!
//! The candidate command is re-run through the user's shell in interactive
//! mode so aliases and functions resolve as they did originally. Re-running
//! may repeat side effects of the command.

use std::time::Duration;

use tracing::{debug, warn};

use super::{CommandRunner, Invocation, RunError, clean_output};
use crate::context::Shell;
use crate::error::{AcquireError, Result};

/// Error text recovered from a re-run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reproduction {
    pub output: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Build the invocation that re-runs `command` under `shell` on `os`.
pub fn build_invocation(command: &str, shell: &Shell, os: &str) -> Invocation {
    if os == "windows" {
        return Invocation {
            program: "cmd".to_string(),
            args: vec!["/C".to_string(), command.to_string()],
        };
    }

    let mut args = Vec::with_capacity(3);
    if matches!(shell, Shell::Bash | Shell::Zsh | Shell::Fish) {
        args.push("-i".to_string());
    }
    args.push("-c".to_string());
    args.push(command.to_string());
    Invocation {
        program: shell.program().to_string(),
        args,
    }
}

/// Applies the reproduction policy on top of a [`CommandRunner`].
pub struct ErrorReproducer<R> {
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> ErrorReproducer<R> {
    pub fn new(runner: R, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Re-run `command` and decide whether what it printed is error text.
    ///
    /// - non-zero exit: the combined output is the error
    /// - zero exit with output: still treated as error text, since some tools
    ///   report problems without failing (this also catches plain log output)
    /// - zero exit without output: [`AcquireError::NoErrorDetected`]
    pub async fn reproduce(&self, command: &str, shell: &Shell, os: &str) -> Result<Reproduction> {
        let invocation = build_invocation(command, shell, os);
        debug!("Re-running {:?} with timeout {:?}", invocation, self.timeout);

        let output = match self.runner.run(&invocation, self.timeout).await {
            Ok(output) => output,
            Err(RunError::TimedOut) => {
                warn!("Re-running '{}' exceeded {:?}, process killed", command, self.timeout);
                return Err(AcquireError::ReproductionTimeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                });
            }
            Err(RunError::Io(source)) => {
                return Err(AcquireError::ReproductionFailed {
                    command: command.to_string(),
                    source,
                });
            }
        };

        let text = clean_output(&output);
        let has_output = !text.trim().is_empty();
        debug!(
            "Re-run of '{}' exited with {:?}, {} bytes of output",
            command,
            output.exit_code,
            text.len()
        );

        if output.success() {
            if !has_output {
                return Err(AcquireError::NoErrorDetected {
                    command: command.to_string(),
                });
            }
            return Ok(Reproduction {
                output: text,
                exit_code: output.exit_code,
            });
        }

        let text = if has_output {
            text
        } else {
            match output.exit_code {
                Some(code) => format!("command exited with status {code} and produced no output"),
                None => "command was terminated by a signal and produced no output".to_string(),
            }
        };
        Ok(Reproduction {
            output: text,
            exit_code: output.exit_code,
        })
    }
}
