//! Notebook (nbformat v4) parsing into lessons.
//!
//! Documents are checked against an embedded JSON Schema before being
//! deserialized, so a malformed lesson fails with a readable message instead
//! of a serde path error deep inside `cells`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::core::types::{ImageFormat, Lesson, Output, Step, StepKind};

const NOTEBOOK_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/nbformat/v4.schema.json"
));

static NOTEBOOK_VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(NOTEBOOK_SCHEMA).map_err(|err| err.to_string())?;
    jsonschema::validator_for(&schema).map_err(|err| err.to_string())
});

/// Notebook text fields are either one string or a list of line fragments.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Multiline {
    One(String),
    Many(Vec<String>),
}

impl Multiline {
    fn into_text(self) -> String {
        match self {
            Multiline::One(text) => text,
            Multiline::Many(parts) => parts.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: StepKind,
    source: Multiline,
    #[serde(default)]
    outputs: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    output_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    text: Option<Multiline>,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

/// Read and parse a lesson file. The lesson id is the file name.
pub fn load_notebook(path: &Path) -> Result<Lesson> {
    let id = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("lesson path has no file name: {}", path.display()))?;
    let contents =
        fs::read_to_string(path).with_context(|| format!("read notebook {}", path.display()))?;
    parse_notebook(id, &contents).with_context(|| format!("parse notebook {}", path.display()))
}

/// Parse notebook JSON into a lesson titled after `id`.
///
/// The title is left equal to `id`; callers that know the lesson extension
/// replace it with a derived label.
pub fn parse_notebook(id: &str, contents: &str) -> Result<Lesson> {
    let mut value: Value =
        serde_json::from_str(contents).context("notebook is not valid JSON")?;
    if value.get("nbformat").and_then(Value::as_u64) == Some(3) {
        value = upgrade_v3(value);
    }
    validate_schema(&value)?;
    let notebook: RawNotebook =
        serde_json::from_value(value).context("deserialize notebook cells")?;

    let total_cells = notebook.cells.len();
    let steps: Vec<Step> = notebook
        .cells
        .into_iter()
        .filter_map(|cell| {
            let source = cell.source.into_text();
            if source.trim().is_empty() {
                return None;
            }
            let outputs = match cell.cell_type {
                StepKind::Code => cell.outputs.into_iter().map(convert_output).collect(),
                StepKind::Markdown | StepKind::Raw => Vec::new(),
            };
            Some((cell.cell_type, source, outputs))
        })
        .enumerate()
        .map(|(index, (kind, source, outputs))| Step {
            index,
            kind,
            source,
            outputs,
        })
        .collect();

    debug!(
        lesson = id,
        cells = total_cells,
        steps = steps.len(),
        "notebook parsed"
    );
    Ok(Lesson {
        id: id.to_string(),
        title: id.to_string(),
        description: None,
        steps,
    })
}

fn validate_schema(value: &Value) -> Result<()> {
    let validator = NOTEBOOK_VALIDATOR
        .as_ref()
        .map_err(|err| anyhow!("invalid notebook schema: {err}"))?;
    let messages: Vec<String> = validator
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "not an nbformat v4 notebook:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}

/// v3 output keys and the mime types they become in v4.
const V3_MIME_KEYS: [(&str, &str); 9] = [
    ("text", "text/plain"),
    ("png", "image/png"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("html", "text/html"),
    ("latex", "text/latex"),
    ("json", "application/json"),
    ("javascript", "application/javascript"),
    ("pdf", "application/pdf"),
];

/// Rewrite an nbformat v3 document into the v4 layout.
///
/// Cells from every worksheet are concatenated, code cells move `input` to
/// `source`, heading cells become markdown headings, and outputs get their
/// v4 types and mime-keyed `data`.
fn upgrade_v3(mut doc: Value) -> Value {
    let worksheets = doc
        .get_mut("worksheets")
        .map(Value::take)
        .unwrap_or_default();
    let cells: Vec<Value> = worksheets
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|sheet| sheet.get("cells").and_then(Value::as_array))
        .flatten()
        .cloned()
        .map(upgrade_v3_cell)
        .collect();
    debug!(cells = cells.len(), "upgraded nbformat v3 notebook");
    json!({
        "nbformat": 4,
        "nbformat_minor": 0,
        "metadata": doc.get_mut("metadata").map(Value::take).unwrap_or_else(|| json!({})),
        "cells": cells,
    })
}

fn upgrade_v3_cell(mut cell: Value) -> Value {
    let Some(fields) = cell.as_object_mut() else {
        return cell;
    };
    let cell_type = fields
        .get("cell_type")
        .and_then(Value::as_str)
        .map(str::to_string);
    match cell_type.as_deref() {
        Some("code") => {
            let input = fields.remove("input").unwrap_or_else(|| json!(""));
            fields.insert("source".to_string(), input);
            let outputs = fields
                .remove("outputs")
                .and_then(|outputs| match outputs {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default();
            fields.insert(
                "outputs".to_string(),
                Value::Array(outputs.into_iter().map(upgrade_v3_output).collect()),
            );
        }
        Some("heading") => {
            let level = fields
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6);
            let text = fields
                .remove("source")
                .and_then(|source| serde_json::from_value::<Multiline>(source).ok())
                .map(Multiline::into_text)
                .unwrap_or_default();
            let heading = format!(
                "{} {}",
                "#".repeat(level as usize),
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            );
            fields.insert("cell_type".to_string(), json!("markdown"));
            fields.insert("source".to_string(), json!(heading));
        }
        _ => {}
    }
    cell
}

fn upgrade_v3_output(mut output: Value) -> Value {
    let Some(fields) = output.as_object_mut() else {
        return output;
    };
    let kind = match fields.get("output_type").and_then(Value::as_str) {
        Some("pyout") => "execute_result",
        Some("pyerr") => "error",
        Some(other) => other,
        None => return output,
    }
    .to_string();
    match kind.as_str() {
        "stream" => {
            let name = fields.remove("stream").unwrap_or_else(|| json!("stdout"));
            fields.insert("name".to_string(), name);
        }
        "execute_result" | "display_data" => {
            let mut data = serde_json::Map::new();
            for (key, mime) in V3_MIME_KEYS {
                if let Some(payload) = fields.remove(key) {
                    data.insert(mime.to_string(), payload);
                }
            }
            fields.insert("data".to_string(), Value::Object(data));
        }
        _ => {}
    }
    fields.insert("output_type".to_string(), json!(kind));
    output
}

/// Mime types tried for rich outputs, highest priority first.
const RICH_PRIORITY: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/svg+xml",
    "text/html",
    "text/plain",
];

fn convert_output(raw: RawOutput) -> Output {
    match raw.output_type.as_str() {
        "stream" => Output::Stream {
            name: raw.name.unwrap_or_else(|| "stdout".to_string()),
            text: raw.text.map(Multiline::into_text).unwrap_or_default(),
        },
        "execute_result" | "display_data" => {
            let mut data = raw.data;
            RICH_PRIORITY
                .iter()
                .find_map(|mime| {
                    let text = data.remove(*mime).and_then(value_text)?;
                    Some(rich_output(mime, text))
                })
                .unwrap_or(Output::Unsupported {
                    output_type: raw.output_type,
                })
        }
        _ => Output::Unsupported {
            output_type: raw.output_type,
        },
    }
}

fn rich_output(mime: &str, text: String) -> Output {
    match mime {
        "image/png" => Output::Image {
            format: ImageFormat::Png,
            data: text,
        },
        "image/jpeg" => Output::Image {
            format: ImageFormat::Jpeg,
            data: text,
        },
        "image/svg+xml" => Output::Svg { markup: text },
        "text/html" => Output::Html { markup: text },
        _ => Output::Text { text },
    }
}

fn value_text(value: Value) -> Option<String> {
    serde_json::from_value::<Multiline>(value)
        .ok()
        .map(Multiline::into_text)
}
