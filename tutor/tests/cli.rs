//! CLI tests for the `tutor` binary.
//!
//! Spawns the binary inside a temp directory whose `notebooks/` folder holds
//! fixture lessons, and checks stdout and exit codes.

use std::fs;
use std::process::Command;

use tutor::exit_codes;
use tutor::test_support::{code_cell, markdown_cell, write_notebook};

fn fixture() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let notebooks = temp.path().join("notebooks");
    fs::create_dir(&notebooks).expect("mkdir");
    write_notebook(
        &notebooks,
        "python-basics.ipynb",
        &[
            markdown_cell("# Variables"),
            code_cell(""),
            code_cell("x = 1\nprint(x)"),
        ],
    );
    temp
}

fn tutor(temp: &tempfile::TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tutor"))
        .current_dir(temp.path())
        .args(args)
        .output()
        .expect("run tutor")
}

#[test]
fn list_prints_ids_and_labels() {
    let temp = fixture();
    let output = tutor(&temp, &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "python-basics.ipynb\tPython Basics\n"
    );
}

#[test]
fn export_writes_delimited_sources() {
    let temp = fixture();
    let output = tutor(&temp, &["export", "python-basics.ipynb"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "--- STEP ---\n# Variables\n\n--- STEP ---\nx = 1\nprint(x)\n\n"
    );
}

#[test]
fn export_to_file() {
    let temp = fixture();
    let out_path = temp.path().join("lesson.txt");
    let output = tutor(
        &temp,
        &[
            "export",
            "python-basics.ipynb",
            "--output",
            out_path.to_str().expect("utf8 path"),
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = fs::read_to_string(out_path).expect("read export");
    assert!(text.starts_with("--- STEP ---\n# Variables"));
}

#[test]
fn show_prints_requested_step() {
    let temp = fixture();
    let output = tutor(&temp, &["show", "python-basics.ipynb", "--step", "2"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Step 2 of 2"));
    assert!(stdout.contains("x = 1\nprint(x)"));
}

#[test]
fn show_out_of_range_fails() {
    let temp = fixture();
    let output = tutor(&temp, &["show", "python-basics.ipynb", "--step", "3"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of range"));
}

#[test]
fn list_creates_missing_lessons_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = tutor(&temp, &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(output.stdout.is_empty());
    assert!(temp.path().join("notebooks").is_dir());
}

#[test]
fn malformed_lesson_reports_error() {
    let temp = fixture();
    fs::write(temp.path().join("notebooks/broken.ipynb"), "[]").expect("write");
    let output = tutor(&temp, &["export", "broken.ipynb"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.ipynb"));
}
