//! Tutor UI server - walks notebook lessons step by step in the browser.

mod pages;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tutor::io::config::{DEFAULT_CONFIG_FILE, load_resolved};
use tutor::io::kernel::PythonLauncher;
use tutor::io::library::Library;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "tutor-ui")]
#[command(about = "Web UI for step-by-step notebook lessons")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8501")]
    port: u16,

    /// Path to the TOML config (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tutor::logging::init("tutor_ui=info,tutor=info,tower_http=info");

    let args = Args::parse();

    let cfg = load_resolved(&args.config)?;
    let library = Library::open(&cfg.lessons_dir, &cfg.lesson_extension)?;
    info!(lessons_dir = %library.dir().display(), "starting tutor-ui");
    warn!("lesson code runs unsandboxed with this process's permissions");

    let launcher = Arc::new(PythonLauncher::new(
        cfg.kernel.clone(),
        library.dir().to_path_buf(),
    ));
    let state = AppState::new(
        library,
        launcher,
        Duration::from_secs(cfg.session_idle_secs),
    );

    state::start_session_sweeper(state.clone());

    let app = Router::new()
        .merge(routes::page_router())
        .nest("/api", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
