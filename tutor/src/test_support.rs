//! Test-only kernels and notebook fixtures.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::io::kernel::{Kernel, KernelError, KernelLauncher, KernelReply};

/// In-memory kernel understanding three statement forms, one per line:
///
/// - `name = value` binds `value` (verbatim text) to `name`;
/// - `print(name)` prints the bound value;
/// - `raise message` faults with `message`.
///
/// A fault discards output printed earlier in the same run.
#[derive(Debug, Default)]
pub struct NamespaceKernel {
    names: BTreeMap<String, String>,
}

impl NamespaceKernel {
    fn exec_line(&mut self, line: &str, out: &mut String) -> Result<(), String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        if let Some(message) = line.strip_prefix("raise ") {
            return Err(message.trim().to_string());
        }
        if let Some(name) = line
            .strip_prefix("print(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let name = name.trim();
            let value = self
                .names
                .get(name)
                .ok_or_else(|| format!("name '{name}' is not defined"))?;
            out.push_str(value);
            out.push('\n');
            return Ok(());
        }
        if let Some((name, value)) = line.split_once('=') {
            self.names
                .insert(name.trim().to_string(), value.trim().to_string());
            return Ok(());
        }
        Err(format!("invalid syntax: {line}"))
    }
}

impl Kernel for NamespaceKernel {
    fn execute(&mut self, code: &str) -> Result<KernelReply, KernelError> {
        let mut out = String::new();
        let mut fault = None;
        for line in code.lines() {
            if let Err(message) = self.exec_line(line, &mut out) {
                fault = Some(message);
                break;
            }
        }
        let (ok, output) = match fault {
            Some(message) => (false, message),
            None => (true, out),
        };
        Ok(KernelReply {
            ok,
            output,
            variables: self.names.clone(),
        })
    }
}

/// Kernel that replays queued replies and records submitted code.
pub struct ScriptedKernel {
    replies: VecDeque<Result<KernelReply, KernelError>>,
    submitted: Arc<Mutex<Vec<String>>>,
}

impl ScriptedKernel {
    pub fn new(replies: Vec<Result<KernelReply, KernelError>>) -> Self {
        Self {
            replies: replies.into(),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the code submitted so far.
    pub fn submitted(&self) -> Arc<Mutex<Vec<String>>> {
        self.submitted.clone()
    }
}

impl Kernel for ScriptedKernel {
    fn execute(&mut self, code: &str) -> Result<KernelReply, KernelError> {
        self.submitted
            .lock()
            .expect("submitted lock")
            .push(code.to_string());
        self.replies
            .pop_front()
            .unwrap_or_else(|| Err(KernelError::Protocol("script exhausted".to_string())))
    }
}

/// Launcher handing out [`NamespaceKernel`]s and counting launches.
#[derive(Debug, Clone, Default)]
pub struct NamespaceLauncher {
    launches: Arc<AtomicUsize>,
}

impl NamespaceLauncher {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl KernelLauncher for NamespaceLauncher {
    fn launch(&self) -> Box<dyn Kernel> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Box::new(NamespaceKernel::default())
    }
}

pub fn markdown_cell(source: &str) -> Value {
    json!({"cell_type": "markdown", "metadata": {}, "source": source})
}

pub fn code_cell(source: &str) -> Value {
    code_cell_with_outputs(source, Vec::new())
}

pub fn code_cell_with_outputs(source: &str, outputs: Vec<Value>) -> Value {
    json!({
        "cell_type": "code",
        "metadata": {},
        "execution_count": null,
        "source": source,
        "outputs": outputs,
    })
}

pub fn stream_output(text: &str) -> Value {
    json!({"output_type": "stream", "name": "stdout", "text": text})
}

pub fn display_output(mime: &str, payload: &str) -> Value {
    json!({"output_type": "display_data", "metadata": {}, "data": {mime: payload}})
}

/// Serialize cells into an nbformat v4 document.
pub fn notebook_json(cells: &[Value]) -> String {
    json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
        "cells": cells,
    })
    .to_string()
}

/// Write a notebook named `name` into `dir`.
pub fn write_notebook(dir: &Path, name: &str, cells: &[Value]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, notebook_json(cells)).expect("write notebook");
    path
}

/// Whether a `python3` interpreter can be spawned on this machine.
pub fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
