//! Command-line access to the lessons directory.
//!
//! Lists lessons, prints individual steps, and exports a lesson as plain
//! text without starting the web UI.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tutor::core::export::export_text;
use tutor::core::walker::{Progress, Walker};
use tutor::exit_codes;
use tutor::io::config::{DEFAULT_CONFIG_FILE, load_resolved};
use tutor::io::library::Library;

#[derive(Parser)]
#[command(
    name = "tutor",
    version,
    about = "Step-by-step notebook lessons"
)]
struct Cli {
    /// Path to the TOML config (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print `id<TAB>label` for every lesson.
    List,
    /// Print one step of a lesson.
    Show {
        /// Lesson file name, e.g. `intro.ipynb`.
        lesson: String,
        /// 1-based step number.
        #[arg(long, default_value_t = 1)]
        step: usize,
    },
    /// Export a lesson's step sources as plain text.
    Export {
        /// Lesson file name, e.g. `intro.ipynb`.
        lesson: String,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tutor::logging::init("warn");
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_resolved(&cli.config)?;
    let library = Library::open(&cfg.lessons_dir, &cfg.lesson_extension)?;
    match cli.command {
        Command::List => cmd_list(&library),
        Command::Show { lesson, step } => cmd_show(&library, &lesson, step),
        Command::Export { lesson, output } => cmd_export(&library, &lesson, output),
    }
}

fn cmd_list(library: &Library) -> Result<()> {
    for entry in library.list()? {
        println!("{}\t{}", entry.id, entry.label);
    }
    Ok(())
}

fn cmd_show(library: &Library, id: &str, step: usize) -> Result<()> {
    let lesson = library.load(id)?;
    let mut walker = Walker::new(lesson.total_steps());
    if walker.is_empty() {
        bail!("lesson {id} has no steps");
    }
    if !walker.jump(step) {
        bail!(
            "step {step} out of range (lesson has {} steps)",
            walker.total()
        );
    }
    let progress = Progress::of(&walker);
    let current = lesson
        .step(walker.current())
        .context("current step missing")?;
    println!("{}", lesson.title);
    println!("Step {} of {} ({:?})", progress.step, progress.total, current.kind);
    println!();
    println!("{}", current.source);
    Ok(())
}

fn cmd_export(library: &Library, id: &str, output: Option<PathBuf>) -> Result<()> {
    let lesson = library.load(id)?;
    let text = export_text(&lesson);
    match output {
        Some(path) => {
            fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        }
        None => print!("{text}"),
    }
    Ok(())
}
