//! The persistent execution environment of one lesson session.
//!
//! Code from any step runs against the same namespace, so a variable defined
//! in step 2 is visible in step 5. Every failure, whether the code raised or
//! the interpreter itself broke, comes back as plain output text: callers
//! never see an error from [`run`].

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::io::kernel::{Kernel, KernelLauncher};

pub struct ExecutionEnvironment {
    kernel: Box<dyn Kernel>,
    variables: BTreeMap<String, String>,
    runs: usize,
}

impl ExecutionEnvironment {
    pub fn new(kernel: Box<dyn Kernel>) -> Self {
        Self {
            kernel,
            variables: BTreeMap::new(),
            runs: 0,
        }
    }

    pub fn launch(launcher: &dyn KernelLauncher) -> Self {
        Self::new(launcher.launch())
    }

    /// True until the first run against this environment (or after the
    /// interpreter was lost and its namespace with it).
    pub fn is_empty(&self) -> bool {
        self.runs == 0
    }

    /// Names defined so far, mapped to their `repr` text.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Execute `code` and return everything it printed.
    ///
    /// If the code raises, the fault's description is returned instead of
    /// the captured output, through the same channel.
    pub fn run(&mut self, code: &str) -> String {
        match self.kernel.execute(code) {
            Ok(reply) => {
                self.runs += 1;
                self.variables = reply.variables;
                debug!(ok = reply.ok, runs = self.runs, "code run finished");
                reply.output
            }
            Err(err) => {
                info!(err = %err, "kernel failure, environment cleared");
                self.runs = 0;
                self.variables.clear();
                err.to_string()
            }
        }
    }
}

/// Free-function form of [`ExecutionEnvironment::run`].
pub fn run(code: &str, env: &mut ExecutionEnvironment) -> String {
    env.run(code)
}
