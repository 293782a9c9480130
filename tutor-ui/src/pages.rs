//! Server-side HTML rendering of the lesson page.
//!
//! Handlers build a [`PageView`] from the session under its lock and hand it
//! to minijinja; templates never see the session itself.

use anyhow::Result;
use minijinja::{Environment, context};
use pulldown_cmark::{Event, Options, Parser, html};
use serde::Serialize;
use tutor::core::types::{Step, StepKind};
use tutor::core::walker::Progress;
use tutor::io::library::LessonEntry;
use tutor::render::{RenderedOutput, render_output};
use tutor::session::Session;

const LESSON_TEMPLATE: &str = include_str!("../templates/lesson.html");

/// Template engine wrapper around minijinja.
pub struct Pages {
    env: Environment<'static>,
}

impl Default for Pages {
    fn default() -> Self {
        Self::new()
    }
}

impl Pages {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("lesson.html", LESSON_TEMPLATE)
            .expect("lesson template should be valid");
        Self { env }
    }

    pub fn render(&self, view: &PageView) -> Result<String> {
        let template = self.env.get_template("lesson.html")?;
        let rendered = template.render(context! { page => view })?;
        Ok(rendered)
    }
}

#[derive(Debug, Serialize)]
pub struct PageView {
    pub session_id: String,
    pub lessons: Vec<LessonEntry>,
    pub lessons_dir: String,
    pub notice: Option<String>,
    pub lesson: Option<LessonView>,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub progress: Progress,
    pub percent: u32,
    pub can_previous: bool,
    pub can_next: bool,
    pub step: Option<StepView>,
}

#[derive(Debug, Serialize)]
pub struct StepView {
    pub number: usize,
    pub kind: StepKind,
    pub source: String,
    /// Rendered HTML for markdown steps.
    pub markdown_html: Option<String>,
    pub outputs: Vec<OutputView>,
    /// Output of the last run of this step, if any.
    pub run_output: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputView {
    Text { text: String },
    Image { url: String, mime: &'static str },
    Svg { markup: String },
    Html { markup: String },
}

impl PageView {
    /// Snapshot everything the page shows. Takes the pending notice, so a
    /// load failure is reported on exactly one render.
    pub fn build(session_id: &str, session: &mut Session, lessons: Vec<LessonEntry>) -> Self {
        let notice = session.take_notice();
        let lessons_dir = session.library().dir().display().to_string();
        let lesson = session.lesson().map(|lesson| {
            let walker = session.walker();
            let progress = session.progress();
            LessonView {
                id: lesson.id.clone(),
                title: lesson.title.clone(),
                description: lesson.description.clone(),
                progress,
                percent: progress.percent(),
                can_previous: walker.can_previous(),
                can_next: walker.can_next(),
                step: session.current_step().map(|step| {
                    StepView::build(session_id, step, session.last_run_for_current())
                }),
            }
        });
        Self {
            session_id: session_id.to_string(),
            lessons,
            lessons_dir,
            notice,
            lesson,
        }
    }
}

impl StepView {
    fn build(session_id: &str, step: &Step, run_output: Option<&str>) -> Self {
        let outputs = step
            .outputs
            .iter()
            .enumerate()
            .filter_map(|(k, output)| {
                let view = match render_output(output)? {
                    RenderedOutput::Text { text } => OutputView::Text { text },
                    RenderedOutput::Bitmap { mime, .. } => OutputView::Image {
                        url: output_url(session_id, step.index, k),
                        mime,
                    },
                    RenderedOutput::Svg { markup } => OutputView::Svg { markup },
                    RenderedOutput::Html { markup } => OutputView::Html { markup },
                };
                Some(view)
            })
            .collect();
        Self {
            number: step.index + 1,
            kind: step.kind,
            source: step.source.clone(),
            markdown_html: (step.kind == StepKind::Markdown)
                .then(|| markdown_to_html(&step.source)),
            outputs,
            run_output: run_output.map(str::to_string),
        }
    }
}

/// Render CommonMark (with tables and strikethrough) to HTML. Raw HTML in
/// the source is emitted as escaped text.
pub fn markdown_to_html(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// URL serving the decoded bytes of output `k` of step `index`.
pub fn output_url(session_id: &str, index: usize, k: usize) -> String {
    format!("/s/{session_id}/outputs/{index}/{k}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tutor::io::library::Library;
    use tutor::test_support::{
        NamespaceLauncher, code_cell, code_cell_with_outputs, display_output, markdown_cell,
        stream_output, write_notebook,
    };

    fn session(dir: &std::path::Path) -> Session {
        let library = Library::open(dir, "ipynb").expect("open");
        Session::new(library, Arc::new(NamespaceLauncher::default()))
    }

    fn render(session: &mut Session) -> String {
        let lessons = session.library().list().expect("list");
        let view = PageView::build("sid", session, lessons);
        Pages::new().render(&view).expect("render")
    }

    #[test]
    fn welcome_page_without_lesson() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_notebook(temp.path(), "intro.ipynb", &[markdown_cell("hi")]);
        let mut session = session(temp.path());
        let html = render(&mut session);
        assert!(html.contains("Please select a lesson"));
        assert!(html.contains("Intro"));
    }

    #[test]
    fn empty_directory_shows_warning() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        let html = render(&mut session);
        assert!(html.contains("No notebooks found"));
    }

    #[test]
    fn step_page_shows_progress_and_escapes_markdown() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_notebook(
            temp.path(),
            "intro.ipynb",
            &[markdown_cell("<script>alert(1)</script>"), code_cell("x = 1")],
        );
        let mut session = session(temp.path());
        session.select("intro.ipynb");
        let html = render(&mut session);
        assert!(html.contains("Step 1 of 2"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
    }

    #[test]
    fn markdown_steps_are_rendered() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_notebook(
            temp.path(),
            "md.ipynb",
            &[markdown_cell("# Python Basics\n\nUse `len` to *count*.")],
        );
        let mut session = session(temp.path());
        session.select("md.ipynb");
        let html = render(&mut session);
        assert!(html.contains("<h1>Python Basics</h1>"));
        assert!(html.contains("<code>len</code>"));
        assert!(html.contains("<em>count</em>"));
        assert!(!html.contains("# Python Basics"));
    }

    #[test]
    fn markdown_raw_html_is_escaped() {
        assert_eq!(
            markdown_to_html("hi <b>there</b>"),
            "<p>hi &lt;b&gt;there&lt;/b&gt;</p>\n"
        );
    }

    #[test]
    fn saved_outputs_are_rendered_by_kind() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_notebook(
            temp.path(),
            "plots.ipynb",
            &[code_cell_with_outputs(
                "plot()",
                vec![
                    stream_output("hello stream"),
                    display_output("image/png", "iVBORw0KGgo="),
                    display_output("image/svg+xml", "<svg id=\"chart\"></svg>"),
                    display_output("text/html", "<b>bold</b>"),
                    serde_json::json!({
                        "output_type": "error",
                        "ename": "E",
                        "evalue": "",
                        "traceback": [],
                    }),
                ],
            )],
        );
        let mut session = session(temp.path());
        session.select("plots.ipynb");
        let html = render(&mut session);
        assert!(html.contains("hello stream"));
        assert!(html.contains("src=\"&#x2f;s&#x2f;sid&#x2f;outputs&#x2f;0&#x2f;1\""));
        assert!(html.contains("<svg id=\"chart\"></svg>"));
        assert!(html.contains("srcdoc=\"&lt;b&gt;bold&lt;&#x2f;b&gt;\""));
    }

    #[test]
    fn run_output_and_empty_run_message() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_notebook(
            temp.path(),
            "run.ipynb",
            &[code_cell("x = 5"), code_cell("print(x)")],
        );
        let mut session = session(temp.path());
        session.select("run.ipynb");
        session.run_current();
        let html = render(&mut session);
        assert!(html.contains("Code executed successfully (no output)."));

        session.next();
        session.run_current();
        let html = render(&mut session);
        assert!(html.contains("5\n"));
    }

    #[test]
    fn load_failure_notice_is_shown_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("bad.ipynb"), "nope").expect("write");
        let mut session = session(temp.path());
        session.select("bad.ipynb");
        let first = render(&mut session);
        assert!(first.contains("Error loading notebook"));
        let second = render(&mut session);
        assert!(!second.contains("Error loading notebook"));
        assert!(second.contains("Please select a lesson"));
    }
}
