//! Blocking shell-command runner behind the `run-commands` executor.
//!
//! Each command gets a wall-clock budget and a per-stream capture limit.
//! Pipes are always drained to EOF so a chatty child never blocks on a full
//! pipe, even after the limit is reached.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Budget for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub timeout: Duration,
    /// Bytes kept per stream; the rest is counted and dropped.
    pub output_limit_bytes: usize,
}

/// One captured stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// `[<label>: output truncated ...]` when either stream hit the limit.
    pub fn truncated_notice(&self, label: &str) -> Option<String> {
        if self.stdout.dropped == 0 && self.stderr.dropped == 0 {
            return None;
        }
        Some(format!(
            "[{label}: output truncated, {} stdout bytes and {} stderr bytes dropped]",
            self.stdout.dropped, self.stderr.dropped
        ))
    }
}

/// How long to wait for the readers once the command has exited.
const READER_GRACE: Duration = Duration::from_secs(1);

/// Run `cmd` to completion (or until the timeout kills it), capturing output.
///
/// On unix the command leads its own process group and a timeout kills the
/// whole group, so descendants holding the pipes go down with it.
#[instrument(skip_all, fields(timeout_secs = limits.timeout.as_secs()))]
pub fn run_captured(mut cmd: Command, limits: RunLimits) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn().context("spawn command")?;
    debug!(pid = child.id(), "command spawned");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let limit = limits.output_limit_bytes as u64;
    let stdout = spawn_reader(stdout, limit);
    let stderr = spawn_reader(stderr, limit);

    let (status, timed_out) = match child.wait_timeout(limits.timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!("command timed out, killing");
            kill_group(child.id());
            // Already gone if the group kill reached it.
            let _ = child.kill();
            (child.wait().context("reap killed command")?, true)
        }
    };

    let stdout = collect(stdout, "stdout")?;
    let stderr = collect(stderr, "stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "output truncated"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: u64) -> Receiver<io::Result<Captured>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(capture(reader, limit));
    });
    rx
}

/// Wait up to [`READER_GRACE`] for a reader. A stream still held open by an
/// escaped descendant is abandoned as empty.
fn collect(rx: Receiver<io::Result<Captured>>, stream: &str) -> Result<Captured> {
    match rx.recv_timeout(READER_GRACE) {
        Ok(captured) => captured.with_context(|| format!("read {stream}")),
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream, "stream still open after exit, abandoning it");
            Ok(Captured::default())
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("{stream} reader panicked")),
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let status = Command::new("sh")
        .args(["-c", "kill -KILL -- -\"$0\"", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(pid, ?status, "process group kill failed"),
        Err(err) => warn!(pid, error = %err, "process group kill failed"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Keep the first `limit` bytes, count and discard the rest.
fn capture<R: Read>(reader: R, limit: u64) -> io::Result<Captured> {
    let mut bytes = Vec::new();
    let mut head = reader.take(limit);
    head.read_to_end(&mut bytes)?;
    let dropped = io::copy(&mut head.into_inner(), &mut io::sink())?;
    Ok(Captured { bytes, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn limits(timeout: Duration, output_limit_bytes: usize) -> RunLimits {
        RunLimits {
            timeout,
            output_limit_bytes,
        }
    }

    #[test]
    fn exit_status_and_both_streams_are_kept() {
        let output = run_captured(
            sh("echo built; echo warning >&2; exit 3"),
            limits(Duration::from_secs(5), 1024),
        )
        .expect("run");
        assert_eq!(output.status.code(), Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.bytes, b"built\n");
        assert_eq!(output.stderr.bytes, b"warning\n");
        assert_eq!(output.truncated_notice("build"), None);
    }

    #[test]
    fn output_past_the_limit_is_counted() {
        let output = run_captured(sh("printf abcdefghij"), limits(Duration::from_secs(5), 4))
            .expect("run");
        assert!(output.success());
        assert_eq!(output.stdout.bytes, b"abcd");
        assert_eq!(output.stdout.dropped, 6);
        assert_eq!(
            output.truncated_notice("lint").as_deref(),
            Some("[lint: output truncated, 6 stdout bytes and 0 stderr bytes dropped]")
        );
    }

    #[test]
    fn slow_command_is_killed() {
        let output = run_captured(sh("sleep 5"), limits(Duration::from_millis(100), 1024))
            .expect("run");
        assert!(output.timed_out);
        assert!(!output.success());
    }

    #[test]
    fn timeout_covers_compound_commands() {
        let started = std::time::Instant::now();
        let output = run_captured(
            sh("echo before; sleep 3; true"),
            limits(Duration::from_millis(200), 1024),
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.stdout.bytes, b"before\n");
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "took {:?}",
            started.elapsed()
        );
    }
}
