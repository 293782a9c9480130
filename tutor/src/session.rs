//! One learner's view of the lessons: active lesson, position, and the
//! execution environment that code from every step shares.
//!
//! Invariants maintained here:
//! - the walker always matches the active lesson's step count;
//! - selecting a *different* lesson resets the position to the first step and
//!   replaces the environment with a fresh one;
//! - a lesson that fails to load leaves no lesson selected and queues a
//!   notice that is shown exactly once.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::core::export::{export_file_name, export_text};
use crate::core::types::{Lesson, Step};
use crate::core::walker::{Progress, Walker};
use crate::environment::ExecutionEnvironment;
use crate::io::kernel::KernelLauncher;
use crate::io::library::Library;

/// Output of the most recent run, tied to the step it ran for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub step: usize,
    pub output: String,
}

pub struct Session {
    library: Library,
    launcher: Arc<dyn KernelLauncher>,
    lesson: Option<Lesson>,
    walker: Walker,
    env: ExecutionEnvironment,
    last_run: Option<RunRecord>,
    notice: Option<String>,
}

impl Session {
    pub fn new(library: Library, launcher: Arc<dyn KernelLauncher>) -> Self {
        let env = ExecutionEnvironment::launch(launcher.as_ref());
        Self {
            library,
            launcher,
            lesson: None,
            walker: Walker::default(),
            env,
            last_run: None,
            notice: None,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn lesson(&self) -> Option<&Lesson> {
        self.lesson.as_ref()
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.walker)
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.env
    }

    /// Select a lesson by id.
    ///
    /// Reselecting the active lesson reloads its steps from disk but keeps
    /// the position (clamped) and the environment.
    pub fn select(&mut self, id: &str) {
        let same = self.lesson.as_ref().is_some_and(|lesson| lesson.id == id);
        match self.library.load(id) {
            Ok(lesson) if same => {
                self.walker.resize(lesson.total_steps());
                self.lesson = Some(lesson);
            }
            Ok(lesson) => {
                info!(lesson = %lesson.id, steps = lesson.total_steps(), "lesson selected");
                self.walker = Walker::new(lesson.total_steps());
                self.lesson = Some(lesson);
                self.reset_environment();
            }
            Err(err) => {
                warn!(lesson = id, err = %format!("{err:#}"), "lesson failed to load");
                self.notice = Some(format!("Error loading notebook: {err:#}"));
                self.lesson = None;
                self.walker = Walker::default();
                self.reset_environment();
            }
        }
    }

    /// Drop the active lesson, if any.
    pub fn clear(&mut self) {
        if self.lesson.take().is_some() {
            self.walker = Walker::default();
            self.reset_environment();
        }
    }

    fn reset_environment(&mut self) {
        self.env = ExecutionEnvironment::launch(self.launcher.as_ref());
        self.last_run = None;
    }

    pub fn previous(&mut self) -> bool {
        self.walker.previous()
    }

    pub fn next(&mut self) -> bool {
        self.walker.next()
    }

    /// Jump to a 1-based step number.
    pub fn jump(&mut self, step: usize) -> bool {
        self.walker.jump(step)
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.lesson.as_ref()?.step(self.walker.current())
    }

    /// Run the current step's code against the lesson environment.
    ///
    /// Returns `None` when there is no current code step.
    pub fn run_current(&mut self) -> Option<&str> {
        let step = self.current_step().filter(|step| step.is_code())?;
        let (index, source) = (step.index, step.source.clone());
        let output = self.env.run(&source);
        self.last_run = Some(RunRecord {
            step: index,
            output,
        });
        self.last_run.as_ref().map(|record| record.output.as_str())
    }

    /// Output of the last run, if it belongs to the current step.
    pub fn last_run_for_current(&self) -> Option<&str> {
        self.last_run
            .as_ref()
            .filter(|record| record.step == self.walker.current() && self.lesson.is_some())
            .map(|record| record.output.as_str())
    }

    /// Take the pending one-shot notice.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// `(file name, text)` of the active lesson's export.
    pub fn export(&self) -> Result<(String, String)> {
        let lesson = self
            .lesson
            .as_ref()
            .ok_or_else(|| anyhow!("no lesson selected"))?;
        Ok((export_file_name(lesson), export_text(lesson)))
    }
}
