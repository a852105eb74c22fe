//! Bounded subprocess execution.
//!
//! [`run_bounded`] spawns a command as the leader of its own process
//! group, captures the tail of stdout/stderr, and enforces a wall-clock
//! timeout. A [`ProcessGroupGuard`] signals the whole group when it goes
//! out of scope, so the child and everything it spawned is gone once
//! this function returns, or once its future is dropped mid-wait.

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Maximum bytes kept per output stream (1 MiB).
///
/// The *tail* of each stream is kept: diagnostics from a failed render
/// are at the end.
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long to wait for the output readers after the process group is gone.
const READER_GRACE: Duration = Duration::from_secs(5);

/// Captured output of a finished (or killed) process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// `true` if stdout exceeded [`MAX_OUTPUT_BYTES`] and was cut at the front.
    pub stdout_truncated: bool,
    /// `true` if stderr exceeded [`MAX_OUTPUT_BYTES`] and was cut at the front.
    pub stderr_truncated: bool,
}

/// How a bounded run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The process exited on its own. `code` is `None` when it was killed
    /// by a signal.
    Exited { code: Option<i32> },
    /// The wall-clock timeout fired and the process group was killed.
    TimedOut,
}

impl ExitState {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

/// Result of [`run_bounded`].
#[derive(Debug, Clone)]
pub struct BoundedRun {
    pub exit: ExitState,
    pub output: CapturedOutput,
    pub duration_ms: u64,
}

/// Spawn `cmd`, capture its output, and wait at most `timeout` for it.
///
/// The caller sets program, arguments and working directory. Stdin is
/// closed; stdout and stderr are piped. Returns `Err` only if the process
/// could not be spawned or waited on.
pub async fn run_bounded(cmd: std::process::Command, timeout: Duration) -> io::Result<BoundedRun> {
    let mut cmd = into_group_leader(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;
    let mut group = ProcessGroupGuard::new(child.id());

    let stdout_task = tokio::spawn(read_tail(child.stdout.take(), MAX_OUTPUT_BYTES));
    let stderr_task = tokio::spawn(read_tail(child.stderr.take(), MAX_OUTPUT_BYTES));

    let exit = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            // Leftover descendants would keep the pipes open.
            group.kill();
            ExitState::Exited {
                code: status.code(),
            }
        }
        Ok(Err(e)) => return Err(e),
        Err(_elapsed) => {
            group.kill();
            // Reap the leader; it is already dead or dying from SIGKILL.
            let _ = child.kill().await;
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Process exceeded timeout, process group killed"
            );
            ExitState::TimedOut
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let (stdout, stdout_truncated) = join_reader(stdout_task).await;
    let (stderr, stderr_truncated) = join_reader(stderr_task).await;

    Ok(BoundedRun {
        exit,
        output: CapturedOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            stdout_truncated,
            stderr_truncated,
        },
        duration_ms,
    })
}

#[cfg(unix)]
fn into_group_leader(mut cmd: std::process::Command) -> Command {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
    Command::from(cmd)
}

#[cfg(not(unix))]
fn into_group_leader(cmd: std::process::Command) -> Command {
    Command::from(cmd)
}

/// Kills a process group when dropped unless it was already killed.
///
/// The group id equals the leader's pid because the child is spawned with
/// `process_group(0)`.
struct ProcessGroupGuard {
    pgid: Option<i32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()),
        }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    // Safety: killpg only sends a signal; an empty group yields ESRCH.
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: i32) {
    // The leader is still killed through `kill_on_drop`.
}

/// Read a stream to EOF keeping at most the last `limit` bytes.
///
/// Keeps draining past the limit so the writer never blocks on a full pipe.
async fn read_tail<R: AsyncRead + Unpin>(handle: Option<R>, limit: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut truncated = false;
    let Some(mut h) = handle else {
        return (buf, truncated);
    };

    let mut chunk = [0u8; 8192];
    loop {
        match h.read(&mut chunk).await {
            Ok(0) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Output stream read failed");
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > limit.saturating_mul(2) {
                    let excess = buf.len() - limit;
                    buf.drain(..excess);
                    truncated = true;
                }
            }
        }
    }

    if buf.len() > limit {
        let excess = buf.len() - limit;
        buf.drain(..excess);
        truncated = true;
    }
    (buf, truncated)
}

async fn join_reader(mut task: JoinHandle<(Vec<u8>, bool)>) -> (Vec<u8>, bool) {
    match tokio::time::timeout(READER_GRACE, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Output reader task failed");
            (Vec::new(), false)
        }
        Err(_) => {
            // A process outside the group still holds the pipe.
            task.abort();
            tracing::warn!("Output reader did not finish, output discarded");
            (Vec::new(), true)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
