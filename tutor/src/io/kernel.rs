//! Interpreter kernels that execute lesson code.
//!
//! A [`Kernel`] owns one interpreter namespace. The [`PythonKernel`] keeps a
//! `python3` child alive for the lifetime of a lesson session and exchanges
//! one JSON line per run:
//!
//! ```text
//! -> {"code": "x = 1\nprint(x)"}
//! <- {"ok": true, "output": "1\n", "variables": {"x": "1"}}
//! ```
//!
//! The child runs with the full privileges of this process. There is no
//! sandbox: lesson code can read and write files, open sockets, and spawn
//! processes. The only limits are the per-run timeout and the output cap.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::io::config::KernelConfig;
use crate::io::process::{LineRead, PipedChild, truncate_output, truncated_notice};

const PYTHON_BOOTSTRAP: &str = include_str!("kernel_bootstrap.py");

/// Result of executing one code submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KernelReply {
    /// False when the submitted code raised.
    pub ok: bool,
    /// Captured stdout, or the fault description when `ok` is false.
    pub output: String,
    /// User-visible names in the namespace after the run, with their `repr`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Failures of the kernel itself, as opposed to faults in submitted code.
///
/// Every variant means the interpreter process was discarded: the next
/// `execute` starts from an empty namespace.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("could not start interpreter `{command}`: {reason}")]
    Spawn { command: String, reason: String },
    #[error("execution timed out after {}s; the environment was reset", .0.as_secs())]
    TimedOut(Duration),
    #[error("interpreter exited unexpectedly ({0}); the environment was reset")]
    Exited(String),
    #[error("interpreter protocol error: {0}; the environment was reset")]
    Protocol(String),
}

/// A persistent code namespace.
pub trait Kernel: Send {
    /// Run `code` against the namespace and report captured output.
    fn execute(&mut self, code: &str) -> Result<KernelReply, KernelError>;
}

/// Creates a fresh, empty kernel for each lesson selection.
pub trait KernelLauncher: Send + Sync {
    fn launch(&self) -> Box<dyn Kernel>;
}

#[derive(Serialize)]
struct Request<'a> {
    code: &'a str,
}

/// Kernel backed by a long-lived Python child process.
///
/// The process is started on the first `execute`, so a lesson nobody runs
/// code in never costs an interpreter.
pub struct PythonKernel {
    config: KernelConfig,
    workdir: PathBuf,
    process: Option<PipedChild>,
}

impl PythonKernel {
    pub fn new(config: KernelConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
            process: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn ensure_process(&mut self) -> Result<&mut PipedChild, KernelError> {
        if self.process.is_none() {
            let (program, args) = self
                .config
                .command
                .split_first()
                .ok_or_else(|| KernelError::Spawn {
                    command: String::new(),
                    reason: "empty kernel command".to_string(),
                })?;
            let mut cmd = Command::new(program);
            cmd.args(args)
                .arg("-c")
                .arg(PYTHON_BOOTSTRAP)
                .current_dir(&self.workdir)
                .env("PYTHONIOENCODING", "utf-8");
            let child = PipedChild::spawn(cmd, "python kernel").map_err(|err| {
                KernelError::Spawn {
                    command: self.config.command.join(" "),
                    reason: format!("{err:#}"),
                }
            })?;
            info!(command = %self.config.command.join(" "), workdir = %self.workdir.display(), "python kernel started");
            self.process = Some(child);
        }
        self.process.as_mut().ok_or_else(|| {
            KernelError::Protocol("kernel process missing after start".to_string())
        })
    }

    fn discard(&mut self, err: KernelError) -> KernelError {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        warn!(err = %err, "python kernel discarded");
        err
    }
}

impl Kernel for PythonKernel {
    #[instrument(skip_all, fields(code_bytes = code.len()))]
    fn execute(&mut self, code: &str) -> Result<KernelReply, KernelError> {
        let timeout = self.config.run_timeout();
        let limit = self.config.output_limit_bytes;
        let request = serde_json::to_string(&Request { code })
            .map_err(|err| KernelError::Protocol(err.to_string()))?;

        let process = self.ensure_process()?;
        if let Err(err) = process.send_line(&request) {
            let status = process
                .try_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("{err:#}"));
            return Err(self.discard(KernelError::Exited(status)));
        }

        let line = match process.recv_line(timeout) {
            LineRead::Line(line) => line,
            LineRead::TimedOut => return Err(self.discard(KernelError::TimedOut(timeout))),
            LineRead::Closed => {
                let status = process
                    .try_status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "stdout closed".to_string());
                return Err(self.discard(KernelError::Exited(status)));
            }
        };

        let mut reply: KernelReply = match serde_json::from_str(&line) {
            Ok(reply) => reply,
            Err(err) => return Err(self.discard(KernelError::Protocol(err.to_string()))),
        };
        let (output, dropped) = truncate_output(std::mem::take(&mut reply.output), limit);
        reply.output = output + &truncated_notice(dropped);
        debug!(
            ok = reply.ok,
            output_bytes = reply.output.len(),
            variables = reply.variables.len(),
            "kernel reply"
        );
        Ok(reply)
    }
}

/// Launches one [`PythonKernel`] per lesson selection.
#[derive(Debug, Clone)]
pub struct PythonLauncher {
    config: KernelConfig,
    workdir: PathBuf,
}

impl PythonLauncher {
    pub fn new(config: KernelConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
        }
    }
}

impl KernelLauncher for PythonLauncher {
    fn launch(&self) -> Box<dyn Kernel> {
        Box::new(PythonKernel::new(self.config.clone(), self.workdir.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_interpreter_is_a_spawn_error() {
        let config = KernelConfig {
            command: vec!["tutor-no-such-interpreter".to_string()],
            ..KernelConfig::default()
        };
        let mut kernel = PythonKernel::new(config, std::env::temp_dir());
        let err = kernel.execute("print(1)").expect_err("spawn should fail");
        assert!(matches!(err, KernelError::Spawn { .. }));
        assert!(err.to_string().contains("tutor-no-such-interpreter"));
        assert!(!kernel.is_running());
    }

    #[test]
    fn kernel_is_started_lazily() {
        let kernel = PythonKernel::new(KernelConfig::default(), std::env::temp_dir());
        assert!(!kernel.is_running());
    }

    #[test]
    fn timeout_message_names_the_limit() {
        let err = KernelError::TimedOut(Duration::from_secs(30));
        assert_eq!(
            err.to_string(),
            "execution timed out after 30s; the environment was reset"
        );
    }
}
