//! The lessons directory: listing, loading, and companion descriptions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::labels::label_for;
use crate::core::types::Lesson;
use crate::io::notebook::load_notebook;

/// A lesson file available for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonEntry {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
    extension: String,
}

impl Library {
    /// Open the lessons directory, creating it if it does not exist yet.
    pub fn open(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            info!(dir = %dir.display(), "creating lessons directory");
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("create lessons directory {}", dir.display()))?;
        Ok(Self {
            dir,
            extension: extension.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lesson files in the directory, sorted by file name.
    pub fn list(&self) -> Result<Vec<LessonEntry>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("read lessons directory {}", self.dir.display()))?;
        let suffix = self.suffix();
        let mut lessons = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // Suffix match, so a file named exactly `.ipynb` is listed too.
            let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .filter(|name| name.ends_with(&suffix))
            else {
                continue;
            };
            lessons.push(LessonEntry {
                id: id.to_string(),
                label: self.label_for(id),
            });
        }
        lessons.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = lessons.len(), "listed lessons");
        Ok(lessons)
    }

    fn suffix(&self) -> String {
        format!(".{}", self.extension)
    }

    pub fn label_for(&self, id: &str) -> String {
        label_for(id, &self.extension)
    }

    /// Load a lesson by id, attaching its title and companion description.
    pub fn load(&self, id: &str) -> Result<Lesson> {
        let path = self.lesson_path(id)?;
        let mut lesson = load_notebook(&path)?;
        lesson.title = self.label_for(id);
        lesson.description = self.description_for(id);
        Ok(lesson)
    }

    /// Contents of `<stem>.md` beside the lesson, if readable.
    pub fn description_for(&self, id: &str) -> Option<String> {
        self.lesson_path(id).ok()?;
        let stem = id.strip_suffix(self.suffix().as_str()).unwrap_or(id);
        let path = self.dir.join(format!("{stem}.md"));
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                debug!(path = %path.display(), err = %err, "no companion description");
                None
            }
        }
    }

    fn lesson_path(&self, id: &str) -> Result<PathBuf> {
        let plain = Path::new(id)
            .file_name()
            .is_some_and(|name| name == id);
        if id.is_empty() || !plain || id == ".." {
            bail!("invalid lesson id {id:?}");
        }
        Ok(self.dir.join(id))
    }
}
