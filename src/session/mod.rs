//! Session lifecycle.
//!
//! Maps caller-issued session ids to live `DialogueSession` values. Each
//! session sits behind its own `tokio::sync::Mutex` — that lock is what
//! serializes `step` calls on one dialogue while distinct dialogues proceed
//! in parallel. Sessions expire after an inactivity TTL, checked lazily on
//! access and by an explicit sweep; a session whose lock is held by an
//! in-flight mutation is never expired out from under it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::triage::DialogueSession;

/// A session handle. Lock it to step the dialogue.
pub type SharedSession = Arc<AsyncMutex<DialogueSession>>;

/// In-memory session registry with TTL-based expiry.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.session_ttl)
    }

    /// Fetch a live session, creating one on first touch.
    ///
    /// An expired session is replaced with a fresh one under the same id —
    /// from the caller's perspective the dialogue simply starts over.
    pub fn get_or_create(&self, id: Uuid) -> SharedSession {
        let mut sessions = self.lock_map();

        if let Some(existing) = sessions.get(&id) {
            if !self.expired_and_idle(existing) {
                return Arc::clone(existing);
            }
            tracing::info!(session = %id, "Replacing expired session on access");
        }

        let fresh: SharedSession = Arc::new(AsyncMutex::new(DialogueSession::new(id)));
        sessions.insert(id, Arc::clone(&fresh));
        fresh
    }

    /// Fetch a live session, surfacing absence and expiry distinctly.
    pub fn get(&self, id: Uuid) -> Result<SharedSession, EngineError> {
        let mut sessions = self.lock_map();

        let Some(existing) = sessions.get(&id) else {
            return Err(EngineError::SessionNotFound(id));
        };

        if self.expired_and_idle(existing) {
            sessions.remove(&id);
            tracing::info!(session = %id, "Session expired on access");
            return Err(EngineError::SessionExpired(id));
        }

        Ok(Arc::clone(existing))
    }

    /// Explicitly end a session. Returns whether one was removed.
    pub fn end(&self, id: Uuid) -> bool {
        self.lock_map().remove(&id).is_some()
    }

    /// Remove every expired, idle session. Safe to run concurrently with
    /// live access: a session whose lock is held (an in-flight `step`) is
    /// skipped and picked up by a later sweep.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.lock_map();
        let stale: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, session)| self.expired_and_idle(session))
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            sessions.remove(id);
        }

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "Swept expired sessions");
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    pub fn session_ids(&self) -> Vec<Uuid> {
        self.lock_map().keys().copied().collect()
    }

    /// Expired AND currently unlocked. A held lock means a mutation is in
    /// flight, and expiry is deferred until it completes.
    fn expired_and_idle(&self, session: &SharedSession) -> bool {
        let Ok(guard) = session.try_lock() else {
            return false;
        };
        let age = (Utc::now() - guard.updated_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.ttl
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
