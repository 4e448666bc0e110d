//! Session data.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A server-side session and its key/value data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with the given ID and TTL.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    /// Create a session with a fresh random ID.
    pub fn generate(ttl: Duration) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), ttl)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Typed read. Returns `None` if the key is missing or holds another type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store a value, replacing any previous one.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get_set() {
        let mut session = Session::new("abc", Duration::from_secs(60));
        session.set("csrf_token", "tok").unwrap();
        session.set("visits", 3u32).unwrap();

        assert_eq!(session.get::<String>("csrf_token"), Some("tok".to_string()));
        assert_eq!(session.get::<u32>("visits"), Some(3));
        assert_eq!(session.get::<u32>("csrf_token"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut session = Session::new("abc", Duration::from_secs(60));
        session.set("csrf_token", "first").unwrap();
        session.set("csrf_token", "second").unwrap();

        assert_eq!(session.data.len(), 1);
        assert_eq!(session.get::<String>("csrf_token"), Some("second".to_string()));
    }

    #[test]
    fn test_expiry() {
        let session = Session::new("abc", Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.is_expired());

        let fresh = Session::generate(Duration::from_secs(60));
        assert!(!fresh.is_expired());
        assert_eq!(fresh.id.len(), 36);
    }
}
