use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::session::history::PredictionHistory;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct Session {
    history: Arc<Mutex<PredictionHistory>>,
    last_seen: Instant,
}

impl Session {
    fn new() -> Self {
        Session {
            history: Arc::new(Mutex::new(PredictionHistory::new())),
            last_seen: Instant::now(),
        }
    }
}

/// Per-session prediction histories for concurrent callers.
///
/// Each session id owns its own history; no entry is ever visible to another
/// session. The map lock is only held to look a session up, so work done
/// against one history never waits on another session. Sessions idle for
/// longer than the timeout are dropped, and the least recently seen session
/// is evicted when the store is full.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

fn lock_history(history: &Mutex<PredictionHistory>) -> MutexGuard<'_, PredictionHistory> {
    // A panic while holding the lock leaves the history intact
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn start(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.lock();
        self.sweep(&mut sessions);
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session = %oldest, "Evicted least recently used session");
            }
        }
        sessions.insert(id, Session::new());
        debug!(session = %id, "Session started");
        id
    }

    /// Returns `id` if it names a live session and marks it as seen.
    pub fn resume(&self, id: Option<Uuid>) -> Option<Uuid> {
        let id = id?;
        let mut sessions = self.lock();
        self.sweep(&mut sessions);
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(id)
    }

    /// Returns `id` if it is live, otherwise a freshly started session.
    pub fn resume_or_start(&self, id: Option<Uuid>) -> Uuid {
        match self.resume(id) {
            Some(id) => id,
            None => self.start(),
        }
    }

    fn history_handle(&self, id: Uuid) -> Arc<Mutex<PredictionHistory>> {
        let mut sessions = self.lock();
        let session = sessions.entry(id).or_insert_with(Session::new);
        session.last_seen = Instant::now();
        Arc::clone(&session.history)
    }

    /// Runs `f` with exclusive access to the session's history.
    ///
    /// Only calls for the same session are serialised.
    pub fn with_history<T>(&self, id: Uuid, f: impl FnOnce(&mut PredictionHistory) -> T) -> T {
        let handle = self.history_handle(id);
        let mut history = lock_history(&handle);
        f(&mut history)
    }

    /// Copy of the session's history; empty for an unknown session.
    pub fn snapshot(&self, id: Uuid) -> PredictionHistory {
        let handle = self.lock().get(&id).map(|session| Arc::clone(&session.history));
        match handle {
            Some(handle) => lock_history(&handle).clone(),
            None => PredictionHistory::new(),
        }
    }

    /// Ends the session and drops its history.
    pub fn end(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(session = %id, "Session ended");
        }
        removed
    }

    /// Drops idle sessions, returning how many were removed.
    pub fn remove_expired(&self) -> usize {
        let mut sessions = self.lock();
        self.sweep(&mut sessions)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Session>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() <= self.idle_timeout);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Expired idle sessions");
        }
        removed
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
