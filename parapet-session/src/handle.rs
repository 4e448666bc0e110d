//! Per-request access to the current session.

use crate::error::SessionResult;
use crate::session::Session;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared handle to the request's session, placed in the request extensions
/// by [`SessionMiddleware`](crate::SessionMiddleware).
///
/// Handlers and later middleware mutate the session through the handle; the
/// middleware persists whatever state it holds once the chain returns.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<HandleState>,
}

#[derive(Debug)]
struct HandleState {
    session: Mutex<Session>,
    is_new: bool,
    destroyed: AtomicBool,
}

impl SessionHandle {
    pub fn new(session: Session, is_new: bool) -> Self {
        Self {
            inner: Arc::new(HandleState {
                session: Mutex::new(session),
                is_new,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> String {
        self.inner.session.lock().id.clone()
    }

    /// True if the session was created for this request.
    pub fn is_new(&self) -> bool {
        self.inner.is_new
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.inner.session.lock().get(key)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()> {
        self.inner.session.lock().set(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.session.lock().remove(key)
    }

    /// Mark the session for deletion. The middleware deletes it from the
    /// store and expires the cookie.
    pub fn destroy(&self) {
        self.inner.session.lock().clear();
        self.inner.destroyed.store(true, Ordering::SeqCst);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Copy of the current session state.
    pub fn snapshot(&self) -> Session {
        self.inner.session.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clones_share_state() {
        let handle = SessionHandle::new(Session::new("s1", Duration::from_secs(60)), true);
        let other = handle.clone();

        other.set("csrf_token", "abc").unwrap();
        assert_eq!(handle.get::<String>("csrf_token"), Some("abc".to_string()));
        assert_eq!(handle.id(), "s1");
        assert!(handle.is_new());
    }

    #[test]
    fn test_destroy_clears_data() {
        let handle = SessionHandle::new(Session::new("s1", Duration::from_secs(60)), false);
        handle.set("user", "alice").unwrap();
        handle.destroy();

        assert!(handle.is_destroyed());
        assert!(handle.snapshot().data.is_empty());
    }
}
