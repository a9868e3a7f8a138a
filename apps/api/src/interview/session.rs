//! Session Registry — process-scoped interview sessions.
//!
//! A session is the cursor into one interview's question list. Starting an
//! already-known session is an explicit resume: the supplied questions are
//! ignored and progress is preserved, so a client reconnect can never reset an
//! interview.
//!
//! Each session is guarded by its own async mutex, held across the whole turn
//! (prompt build → generation call → parse → cursor update). That lock is the
//! single-flight guarantee: two overlapping turns for the same session cannot
//! race on the cursor read-modify-write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

/// Mutable per-session state.
///
/// Invariants: `0 <= cursor <= questions.len()`, and `ended` implies
/// `cursor == questions.len()`.
#[derive(Debug)]
pub struct Session {
    pub questions: Vec<String>,
    pub cursor: usize,
    pub ended: bool,
    touched: Instant,
}

impl Session {
    fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            cursor: 0,
            ended: false,
            touched: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.touched = Instant::now();
    }
}

/// Read-only view of a session, returned to callers of `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub cursor: usize,
    pub ended: bool,
}

pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// The registry: a mutex-guarded map of session handles. The map lock is held
/// only for lookup and insert, never across an await.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for `session_id`, or resumes the existing one as-is
    /// (the supplied `questions` are ignored on resume). Never fails.
    pub async fn start(&self, session_id: &str, questions: Vec<String>) -> SessionSnapshot {
        let handle = {
            let mut map = self.inner.lock().expect("session map lock poisoned");
            map.entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(questions))))
                .clone()
        };

        let mut session = handle.lock().await;
        session.touch();
        SessionSnapshot {
            session_id: session_id.to_string(),
            cursor: session.cursor,
            ended: session.ended,
        }
    }

    /// Hands out the per-session lock, or `None` for an unknown id.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let map = self.inner.lock().expect("session map lock poisoned");
        map.get(session_id).cloned()
    }

    /// Drops sessions idle for longer than `max_idle`. A session whose lock is
    /// currently held has a turn in flight and is kept regardless of age.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut map = self.inner.lock().expect("session map lock poisoned");
        let before = map.len();
        map.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.touched.elapsed() < max_idle,
            Err(_) => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle interview session(s)");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
