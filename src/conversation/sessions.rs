//! Bounded in-memory session map.
//!
//! Each session's [`ConversationContext`] sits behind its own async mutex; a turn holds
//! that lock from intent analysis to context update, so turns of one session never
//! interleave while different sessions proceed in parallel. Sessions idle longer than
//! the TTL are dropped, and when the map is full the least recently used session is
//! evicted to make room.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::context::ConversationContext;
use crate::error::EngineError;

pub type SessionHandle = Arc<tokio::sync::Mutex<ConversationContext>>;

struct SessionEntry {
    owner: String,
    handle: SessionHandle,
    last_access: Instant,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Return the session, creating it on first use.
    ///
    /// A session belongs to the user that created it; any other user is refused.
    pub fn get_or_create(&self, session_id: &str, user_id: &str) -> Result<SessionHandle, EngineError> {
        self.get_or_create_at(session_id, user_id, Instant::now())
    }

    pub(crate) fn get_or_create_at(
        &self,
        session_id: &str,
        user_id: &str,
        now: Instant,
    ) -> Result<SessionHandle, EngineError> {
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, now);

        if let Some(entry) = sessions.get_mut(session_id) {
            if entry.owner != user_id {
                tracing::warn!(session_id = %session_id, "session accessed by a different user");
                return Err(EngineError::Unauthorized(format!(
                    "session {session_id} belongs to another user"
                )));
            }
            entry.last_access = now;
            return Ok(Arc::clone(&entry.handle));
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                sessions.remove(&id);
                tracing::debug!(session_id = %id, "evicted least recently used session");
            }
        }

        let handle = Arc::new(tokio::sync::Mutex::new(ConversationContext::new(session_id, user_id)));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                owner: user_id.to_string(),
                handle: Arc::clone(&handle),
                last_access: now,
            },
        );
        tracing::debug!(session_id = %session_id, user_id = %user_id, "session created");
        Ok(handle)
    }

    /// Look up a live session without creating one.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.get_at(session_id, Instant::now())
    }

    pub(crate) fn get_at(&self, session_id: &str, now: Instant) -> Option<SessionHandle> {
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, now);
        sessions.get_mut(session_id).map(|entry| {
            entry.last_access = now;
            Arc::clone(&entry.handle)
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_access) < self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, "expired idle sessions");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_secs: u64, capacity: usize) -> SessionStore {
        SessionStore::new(Duration::from_secs(ttl_secs), capacity)
    }

    #[test]
    fn creation_is_idempotent() {
        let sessions = store(60, 10);
        let a = sessions.get_or_create("s1", "alice").unwrap();
        let b = sessions.get_or_create("s1", "alice").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn other_users_are_refused() {
        let sessions = store(60, 10);
        sessions.get_or_create("s1", "alice").unwrap();
        assert!(matches!(
            sessions.get_or_create("s1", "bob"),
            Err(EngineError::Unauthorized(_))
        ));
    }

    #[test]
    fn idle_sessions_expire() {
        let sessions = store(60, 10);
        let start = Instant::now();
        let first = sessions.get_or_create_at("s1", "alice", start).unwrap();
        assert!(sessions.get_at("s1", start + Duration::from_secs(30)).is_some());
        // Access at +30s refreshed the TTL.
        assert!(sessions.get_at("s1", start + Duration::from_secs(80)).is_some());
        assert!(sessions.get_at("s1", start + Duration::from_secs(200)).is_none());

        let fresh = sessions
            .get_or_create_at("s1", "alice", start + Duration::from_secs(200))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[test]
    fn full_store_evicts_least_recently_used() {
        let sessions = store(600, 2);
        let start = Instant::now();
        sessions.get_or_create_at("a", "u", start).unwrap();
        sessions.get_or_create_at("b", "u", start + Duration::from_secs(1)).unwrap();
        // Touch "a" so "b" becomes the LRU entry.
        sessions.get_at("a", start + Duration::from_secs(2)).unwrap();
        sessions.get_or_create_at("c", "u", start + Duration::from_secs(3)).unwrap();

        assert_eq!(sessions.len(), 2);
        assert!(sessions.get_at("a", start + Duration::from_secs(4)).is_some());
        assert!(sessions.get_at("b", start + Duration::from_secs(4)).is_none());
    }

    #[tokio::test]
    async fn turns_of_one_session_are_serialized() {
        let sessions = store(60, 10);
        let handle = sessions.get_or_create("s1", "alice").unwrap();
        let guard = handle.lock().await;
        let again = sessions.get_or_create("s1", "alice").unwrap();
        assert!(again.try_lock().is_err());
        drop(guard);
        assert!(again.try_lock().is_ok());
    }
}
