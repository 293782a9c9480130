//! HTTP route handlers.
//!
//! Every page action is a form POST that mutates the session and redirects
//! back to `GET /s/{sid}`, so a reload never repeats an action.

use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::{debug, error, warn};
use tutor::io::library::LessonEntry;
use tutor::render::{RenderedOutput, render_output};
use tutor::session::Session;

use crate::pages::PageView;
use crate::state::AppState;

/// Build the page router.
pub fn page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/s/{sid}", get(page))
        .route("/s/{sid}/select", post(select))
        .route("/s/{sid}/previous", post(previous))
        .route("/s/{sid}/next", post(next))
        .route("/s/{sid}/jump", post(jump))
        .route("/s/{sid}/run", post(run))
        .route("/s/{sid}/export", get(export))
        .route("/s/{sid}/outputs/{step}/{k}", get(output_bytes))
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/lessons", get(list_lessons))
}

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    #[serde(default)]
    pub lesson: String,
}

#[derive(Debug, Deserialize)]
pub struct JumpForm {
    pub step: usize,
}

fn page_location(sid: &str) -> String {
    format!("/s/{sid}")
}

fn back_to_page(sid: &str) -> Response {
    Redirect::to(&page_location(sid)).into_response()
}

fn unknown_session(sid: &str) -> Response {
    debug!(session = sid, "unknown session");
    Redirect::to("/").into_response()
}

/// GET / - start a fresh session.
async fn index(State(state): State<AppState>) -> Response {
    let sid = state.open_session();
    back_to_page(&sid)
}

/// GET /s/:sid - render the lesson page.
async fn page(State(state): State<AppState>, Path(sid): Path<String>) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return unknown_session(&sid);
    };
    let lessons = read_lessons(&state).await.unwrap_or_else(|err| {
        warn!(err = %format!("{err:#}"), "listing lessons failed");
        Vec::new()
    });
    let mut session = shared.lock().await;
    let view = PageView::build(&sid, &mut session, lessons);
    drop(session);
    match state.pages.render(&view) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(err = %format!("{err:#}"), "page render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// List the lessons directory on the blocking pool.
async fn read_lessons(state: &AppState) -> anyhow::Result<Vec<LessonEntry>> {
    let library = state.library.clone();
    tokio::task::spawn_blocking(move || library.list()).await?
}

/// Apply `action` to the session on the blocking pool. Used for actions that
/// read lesson files or talk to the interpreter.
async fn with_session_blocking<F>(state: &AppState, sid: &str, action: F) -> Response
where
    F: FnOnce(&mut Session) + Send + 'static,
{
    let Some(shared) = state.sessions.get(sid) else {
        return unknown_session(sid);
    };
    let mut session = shared.lock_owned().await;
    match tokio::task::spawn_blocking(move || action(&mut session)).await {
        Ok(()) => back_to_page(sid),
        Err(err) => {
            error!(session = sid, err = %err, "session action panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /s/:sid/select - open a lesson, or close it when `lesson` is empty.
async fn select(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Form(form): Form<SelectForm>,
) -> Response {
    with_session_blocking(&state, &sid, move |session| {
        if form.lesson.is_empty() {
            session.clear();
        } else {
            session.select(&form.lesson);
        }
    })
    .await
}

/// POST /s/:sid/run - execute the current code step.
async fn run(State(state): State<AppState>, Path(sid): Path<String>) -> Response {
    with_session_blocking(&state, &sid, |session| {
        let ran = session.run_current().is_some();
        debug!(ran, "run requested");
    })
    .await
}

async fn previous(State(state): State<AppState>, Path(sid): Path<String>) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return unknown_session(&sid);
    };
    shared.lock().await.previous();
    back_to_page(&sid)
}

async fn next(State(state): State<AppState>, Path(sid): Path<String>) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return unknown_session(&sid);
    };
    shared.lock().await.next();
    back_to_page(&sid)
}

/// POST /s/:sid/jump - move to a 1-based step; out-of-range requests are
/// ignored.
async fn jump(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Form(form): Form<JumpForm>,
) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return unknown_session(&sid);
    };
    if !shared.lock().await.jump(form.step) {
        debug!(session = %sid, step = form.step, "jump rejected");
    }
    back_to_page(&sid)
}

/// GET /s/:sid/export - download the lesson's step sources.
async fn export(State(state): State<AppState>, Path(sid): Path<String>) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return unknown_session(&sid);
    };
    let exported = shared.lock().await.export();
    match exported {
        Ok((name, text)) => {
            let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "_"));
            (
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                text,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /s/:sid/outputs/:step/:k - decoded bytes of a saved image output.
async fn output_bytes(
    State(state): State<AppState>,
    Path((sid, step, k)): Path<(String, usize, usize)>,
) -> Response {
    let Some(shared) = state.sessions.get(&sid) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let session = shared.lock().await;
    let rendered = session
        .lesson()
        .and_then(|lesson| lesson.step(step))
        .and_then(|step| step.outputs.get(k))
        .and_then(render_output);
    match rendered {
        Some(RenderedOutput::Bitmap { mime, bytes }) => {
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/lessons - lesson ids and display labels.
async fn list_lessons(
    State(state): State<AppState>,
) -> Result<Json<Vec<LessonEntry>>, StatusCode> {
    read_lessons(&state).await.map(Json).map_err(|err| {
        error!(err = %format!("{err:#}"), "listing lessons failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
