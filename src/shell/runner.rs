//! Subprocess runner used for re-running commands.
//!
//! Each run is a separate, non-PTY process:
//! - started in its own session, without a controlling terminal
//! - stdin is closed
//! - stdout and stderr are captured up to [`MAX_CAPTURE_BYTES`] each
//! - time-bounded, after which the process and its descendants are killed

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::output::CaptureBuffer;
use super::{CommandRunner, Invocation, MAX_CAPTURE_BYTES, RunError, RunOutput};

/// Runs invocations as real child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, invocation: &Invocation, limit: Duration) -> Result<RunOutput, RunError> {
        let mut std_cmd = std::process::Command::new(&invocation.program);
        std_cmd.args(&invocation.args);
        // New session: no controlling terminal, so an interactive shell cannot
        // be stopped by terminal job control, and pgid == pid for the kill below.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // SAFETY: setsid is async-signal-safe and touches no parent state.
            unsafe {
                std_cmd.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let mut c = Command::from(std_cmd);
        c.stdin(Stdio::null());
        c.stdout(Stdio::piped());
        c.stderr(Stdio::piped());
        c.kill_on_drop(true);

        let mut child = c.spawn()?;
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let res = timeout(limit, async {
            tokio::try_join!(
                child.wait(),
                read_bounded(stdout, MAX_CAPTURE_BYTES),
                read_bounded(stderr, MAX_CAPTURE_BYTES)
            )
        })
        .await;

        match res {
            Ok(res) => {
                let (status, stdout, stderr) = res?;
                Ok(RunOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                // The child itself is killed when it is dropped.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                Err(RunError::TimedOut)
            }
        }
    }
}

/// Drain a pipe, keeping at most `limit` bytes of it.
async fn read_bounded<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> std::io::Result<Vec<u8>> {
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };
    let mut capture = CaptureBuffer::new(limit);
    let mut chunk = [0u8; 8 * 1024];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        capture.push(&chunk[..n]);
    }
    Ok(capture.into_bytes())
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the session's group belongs to this child.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "killpg({}) failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(pid: u32) {
    debug!("Process {} killed; descendants are not tracked on this platform", pid);
}
