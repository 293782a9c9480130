//! Tutor configuration stored in `tutor.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tutor.toml";

/// Tutor configuration (TOML).
///
/// Missing fields default to values that work out of the box with a
/// `notebooks/` directory next to the binary's working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TutorConfig {
    /// Directory scanned for lessons. Created on startup if absent.
    pub lessons_dir: PathBuf,

    /// File extension (without the dot) that marks a lesson source.
    pub lesson_extension: String,

    /// Browser sessions idle longer than this are dropped together with
    /// their interpreter process.
    pub session_idle_secs: u64,

    pub kernel: KernelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KernelConfig {
    /// Interpreter command; the bootstrap is appended as `-c <script>`.
    pub command: Vec<String>,

    /// Wall-clock limit for a single run. On expiry the interpreter is killed
    /// and the lesson's variables are lost.
    pub run_timeout_secs: u64,

    /// Captured output beyond this many bytes is discarded.
    pub output_limit_bytes: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), "-u".to_string()],
            run_timeout_secs: 30,
            output_limit_bytes: 100_000,
        }
    }
}

impl KernelConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            lessons_dir: PathBuf::from("notebooks"),
            lesson_extension: "ipynb".to_string(),
            session_idle_secs: 60 * 60,
            kernel: KernelConfig::default(),
        }
    }
}

impl TutorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lessons_dir.as_os_str().is_empty() {
            return Err(anyhow!("lessons_dir must not be empty"));
        }
        let ext = self.lesson_extension.trim();
        if ext.is_empty() || ext.starts_with('.') {
            return Err(anyhow!(
                "lesson_extension must be a non-empty extension without a leading dot"
            ));
        }
        if self.session_idle_secs == 0 {
            return Err(anyhow!("session_idle_secs must be > 0"));
        }
        if self.kernel.command.is_empty() || self.kernel.command[0].trim().is_empty() {
            return Err(anyhow!("kernel.command must be a non-empty array"));
        }
        if self.kernel.run_timeout_secs == 0 {
            return Err(anyhow!("kernel.run_timeout_secs must be > 0"));
        }
        if self.kernel.output_limit_bytes == 0 {
            return Err(anyhow!("kernel.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Resolve a relative `lessons_dir` against `base`.
    pub fn resolve_lessons_dir(&mut self, base: &Path) {
        if self.lessons_dir.is_relative() {
            self.lessons_dir = base.join(&self.lessons_dir);
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TutorConfig::default()`.
pub fn load_config(path: &Path) -> Result<TutorConfig> {
    if !path.exists() {
        let cfg = TutorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TutorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load config and resolve a relative `lessons_dir` against the directory
/// holding the config file.
pub fn load_resolved(path: &Path) -> Result<TutorConfig> {
    let mut cfg = load_config(path)?;
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    cfg.resolve_lessons_dir(base);
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, TutorConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tutor.toml");
        fs::write(
            &path,
            "lessons_dir = \"lessons\"\n\n[kernel]\nrun_timeout_secs = 5\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.lessons_dir, PathBuf::from("lessons"));
        assert_eq!(cfg.kernel.run_timeout_secs, 5);
        assert_eq!(cfg.kernel.command, KernelConfig::default().command);
        assert_eq!(cfg.lesson_extension, "ipynb");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tutor.toml");
        fs::write(&path, "[kernel]\nrun_timeout_secs = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("run_timeout_secs"));
    }

    #[test]
    fn dotted_extension_is_rejected() {
        let cfg = TutorConfig {
            lesson_extension: ".ipynb".to_string(),
            ..TutorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_resolved_uses_config_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tutor.toml");
        fs::write(&path, "lessons_dir = \"lessons\"\n").expect("write");
        let cfg = load_resolved(&path).expect("load");
        assert_eq!(cfg.lessons_dir, temp.path().join("lessons"));
    }

    #[test]
    fn relative_lessons_dir_resolves_against_base() {
        let mut cfg = TutorConfig::default();
        cfg.resolve_lessons_dir(Path::new("/srv/tutor"));
        assert_eq!(cfg.lessons_dir, PathBuf::from("/srv/tutor/notebooks"));
    }
}
