//! Long-lived child processes driven over line-oriented pipes.
//!
//! stdout is read on a dedicated thread and forwarded line by line through a
//! channel, so callers can wait for a reply with a deadline instead of
//! blocking on the pipe. stderr is drained into tracing so the child can never
//! stall on a full pipe.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, warn};
use wait_timeout::ChildExt;

/// How long a child gets to exit on its own after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Outcome of waiting for one stdout line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    Line(String),
    TimedOut,
    /// stdout reached EOF; the child exited or closed it.
    Closed,
}

/// A spawned child with piped stdin and line-buffered stdout.
#[derive(Debug)]
pub struct PipedChild {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
}

impl PipedChild {
    /// Spawn `cmd` with all three standard streams piped.
    pub fn spawn(mut cmd: Command, label: &'static str) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(label, "spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(label, err = %e, "failed to spawn command");
                return Err(e).with_context(|| format!("spawn {label}"));
            }
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || forward_lines(stdout, tx));
        thread::spawn(move || drain_stderr(stderr, label));

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines,
        })
    }

    /// Write `line` plus a newline to the child's stdin and flush.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("stdin already closed"))?;
        stdin.write_all(line.as_bytes()).context("write stdin")?;
        stdin.write_all(b"\n").context("write stdin")?;
        stdin.flush().context("flush stdin")?;
        Ok(())
    }

    /// Wait up to `timeout` for the next stdout line.
    pub fn recv_line(&self, timeout: Duration) -> LineRead {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => LineRead::Line(line),
            Err(RecvTimeoutError::Timeout) => LineRead::TimedOut,
            Err(RecvTimeoutError::Disconnected) => LineRead::Closed,
        }
    }

    /// Exit status if the child has already exited.
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Kill the child immediately and reap it.
    pub fn kill(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill() {
            debug!(err = %e, "kill child (already exited?)");
        }
        if let Err(e) = self.child.wait() {
            warn!(err = %e, "wait for killed child");
        }
    }

    /// Close stdin, give the child a short grace period, then kill it.
    pub fn shutdown(&mut self) {
        self.stdin.take();
        match self.child.wait_timeout(SHUTDOWN_GRACE) {
            Ok(Some(status)) => debug!(exit_code = ?status.code(), "child exited"),
            Ok(None) => {
                debug!("child ignored stdin close, killing");
                self.kill();
            }
            Err(e) => {
                warn!(err = %e, "wait for child shutdown");
                self.kill();
            }
        }
    }
}

impl Drop for PipedChild {
    fn drop(&mut self) {
        if self.try_status().is_none() {
            self.shutdown();
        }
    }
}

fn forward_lines<R: Read>(reader: R, tx: mpsc::Sender<String>) {
    let reader = BufReader::new(reader);
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(err = %e, "read child stdout");
                break;
            }
        }
    }
}

fn drain_stderr<R: Read>(reader: R, label: &'static str) {
    let reader = BufReader::new(reader);
    for line in reader.lines() {
        match line {
            Ok(line) => debug!(label, line = %line, "child stderr"),
            Err(_) => break,
        }
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary.
///
/// Returns the kept text and the number of bytes dropped.
pub fn truncate_output(mut text: String, limit: usize) -> (String, usize) {
    if text.len() <= limit {
        return (text, 0);
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let dropped = text.len() - cut;
    text.truncate(cut);
    (text, dropped)
}

/// Notice appended to output that hit the byte limit.
pub fn truncated_notice(dropped: usize) -> String {
    if dropped > 0 {
        format!("\n[output truncated {dropped} bytes]\n")
    } else {
        String::new()
    }
}
