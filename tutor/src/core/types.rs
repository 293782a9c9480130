//! Lesson data model.
//!
//! A [`Lesson`] is produced by the notebook loader and never mutated after
//! that; selecting a different lesson replaces it wholesale.

use serde::{Deserialize, Serialize};

/// One tutorial unit loaded from a single notebook document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Source file name inside the lessons directory (e.g. `intro.ipynb`).
    pub id: String,
    /// Human-readable title derived from the file name.
    pub title: String,
    /// Companion description shown above the first step, if present.
    pub description: Option<String>,
    /// Non-empty cells in notebook order.
    pub steps: Vec<Step>,
}

impl Lesson {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Markdown,
    Code,
    Raw,
}

/// The unit of navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 0-based position after empty cells were dropped.
    pub index: usize,
    pub kind: StepKind,
    /// Raw cell source, untrimmed.
    pub source: String,
    /// Outputs captured when the notebook was authored. Always empty for
    /// non-code steps.
    pub outputs: Vec<Output>,
}

impl Step {
    pub fn is_code(&self) -> bool {
        self.kind == StepKind::Code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Precomputed output replayed verbatim from the notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Text written to a stream (`stdout`/`stderr`) while the cell ran.
    Stream { name: String, text: String },
    /// Raster image; `data` is the base64 payload as stored in the notebook.
    Image { format: ImageFormat, data: String },
    /// Inline SVG markup.
    Svg { markup: String },
    /// Rich HTML representation.
    Html { markup: String },
    /// Plain-text representation.
    Text { text: String },
    /// An output kind the renderer deliberately ignores (e.g. `error`).
    Unsupported { output_type: String },
}
