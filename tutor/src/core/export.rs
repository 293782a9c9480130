//! Plain-text lesson export.

use crate::core::types::Lesson;

/// Delimiter line written before every step.
pub const STEP_DELIMITER: &str = "--- STEP ---";

/// Concatenate every step's raw source, each preceded by [`STEP_DELIMITER`]
/// and followed by a blank line, in step order.
pub fn export_text(lesson: &Lesson) -> String {
    let mut text = String::new();
    for step in &lesson.steps {
        text.push_str(STEP_DELIMITER);
        text.push('\n');
        text.push_str(&step.source);
        text.push_str("\n\n");
    }
    text
}

/// Download file name for an exported lesson.
pub fn export_file_name(lesson: &Lesson) -> String {
    format!("{}.txt", lesson.id)
}
