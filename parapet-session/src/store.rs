//! Session storage.

use crate::error::{SessionError, SessionResult};
use crate::session::Session;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Storage backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session. `ttl` falls back to the store default.
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<Session>;

    /// `Ok(None)` if the session is unknown or expired.
    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>>;

    async fn save(&self, session: &Session) -> SessionResult<()>;

    async fn delete(&self, session_id: &str) -> SessionResult<()>;

    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        Ok(self.get(session_id).await?.is_some())
    }

    async fn count(&self) -> SessionResult<usize>;

    /// Drop expired sessions, returning how many were removed.
    async fn cleanup_expired(&self) -> SessionResult<usize>;
}

/// In-process session store.
///
/// Sessions are lost on restart. Suitable for a single server instance.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    default_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(86400))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<Session> {
        let session = Session::generate(ttl.unwrap_or(self.default_ttl));
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        debug!(session_id = %session.id, "Session created");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let sessions = self.sessions.read();
        Ok(sessions
            .get(session_id)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        if session.id.is_empty() {
            return Err(SessionError::InvalidSessionId(
                "session id is empty".to_string(),
            ));
        }
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.sessions.write().remove(session_id);
        debug!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.read().len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}
