//! Shared application state for the UI server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};
use tutor::io::kernel::KernelLauncher;
use tutor::io::library::Library;
use tutor::session::Session;

use crate::pages::Pages;

/// A session shared between request handlers. Holding the lock is what makes
/// actions on one session strictly sequential.
pub type SharedSession = Arc<AsyncMutex<Session>>;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub library: Library,
    pub launcher: Arc<dyn KernelLauncher>,
    pub sessions: Arc<SessionStore>,
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(library: Library, launcher: Arc<dyn KernelLauncher>, idle: Duration) -> Self {
        Self {
            library,
            launcher,
            sessions: Arc::new(SessionStore::new(idle)),
            pages: Arc::new(Pages::new()),
        }
    }

    /// Start a new browser session and return its id.
    pub fn open_session(&self) -> String {
        let session = Session::new(self.library.clone(), self.launcher.clone());
        self.sessions.insert(session)
    }
}

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

/// Live sessions keyed by an unguessable id.
pub struct SessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    idle: Duration,
}

impl SessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle,
        }
    }

    pub fn insert(&self, session: Session) -> String {
        let id = generate_session_id();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            id.clone(),
            Entry {
                session: Arc::new(AsyncMutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        info!(session = %id, live = entries.len(), "session opened");
        id
    }

    /// Look up a session and mark it as active.
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Remove sessions idle for longer than the configured limit.
    ///
    /// The removed sessions are returned so the caller decides where their
    /// interpreters are shut down.
    pub fn evict_idle(&self, now: Instant) -> Vec<SharedSession> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_seen) > self.idle)
            .map(|(id, _)| id.clone())
            .collect();
        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(entry) = entries.remove(&id) {
                debug!(session = %id, "session expired");
                removed.push(entry.session);
            }
        }
        removed
    }
}

/// Periodically drop idle sessions in a background task.
pub fn start_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        let period = state.sessions.idle.min(Duration::from_secs(60));
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let removed = state.sessions.evict_idle(Instant::now());
            if removed.is_empty() {
                continue;
            }
            info!(
                count = removed.len(),
                live = state.sessions.len(),
                "evicting idle sessions"
            );
            // Dropping a session waits briefly for its interpreter to exit.
            let _ = tokio::task::spawn_blocking(move || drop(removed)).await;
        }
    });
}

fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(20)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor::test_support::NamespaceLauncher;

    fn store_session(dir: &std::path::Path) -> Session {
        let library = Library::open(dir, "ipynb").expect("open");
        Session::new(library, Arc::new(NamespaceLauncher::default()))
    }

    #[test]
    fn inserted_sessions_are_found_by_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.insert(store_session(temp.path()));
        let b = store.insert(store_session(temp.path()));
        assert_ne!(a, b);
        assert_eq!(a.len(), 20);
        assert!(store.get(&a).is_some());
        assert!(store.get("unknown").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(Duration::from_secs(10));
        let id = store.insert(store_session(temp.path()));

        let removed = store.evict_idle(Instant::now());
        assert!(removed.is_empty());

        let removed = store.evict_idle(Instant::now() + Duration::from_secs(11));
        assert_eq!(removed.len(), 1);
        assert!(store.get(&id).is_none());
    }
}
