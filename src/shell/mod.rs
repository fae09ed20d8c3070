//! Re-running commands to recover their error output.
//!
//! Spawning processes goes through the [`CommandRunner`] capability so the
//! reproduction policy can be tested with a scripted runner; [`ShellRunner`]
//! is the real one and owns timeout and termination.

mod output;
mod reproducer;
mod runner;

use std::future::Future;
use std::time::Duration;

pub use output::clean_output;
pub use reproducer::{ErrorReproducer, Reproduction, build_invocation};
pub use runner::ShellRunner;

/// Default wall-clock bound for a re-run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-stream cap on captured bytes; the middle of longer output is dropped.
pub const MAX_CAPTURE_BYTES: usize = 256 * 1024;

/// A program and its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// What a finished process left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug)]
pub enum RunError {
    /// The bound expired and the process was killed.
    TimedOut,
    Io(std::io::Error),
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::Io(e)
    }
}

/// Capability to run an invocation to completion within a time bound.
pub trait CommandRunner {
    fn run(
        &self,
        invocation: &Invocation,
        timeout: Duration,
    ) -> impl Future<Output = Result<RunOutput, RunError>>;
}
