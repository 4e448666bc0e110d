//! Client-side cookie storage.

use cookie::Cookie;
use parking_lot::Mutex;
use tracing::trace;

/// Holds cookies between requests the way a browser would for one origin.
///
/// Path, domain and expiry attributes are not tracked; every stored cookie
/// is sent with every request.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: Mutex<cookie::CookieJar>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one `Set-Cookie` value. Returns the stored cookie, or `None`
    /// when the header deleted the cookie or could not be parsed.
    pub fn store(&self, set_cookie: &str) -> Option<Cookie<'static>> {
        let cookie = Cookie::parse(set_cookie.to_string()).ok()?;
        let deleted = cookie.value().is_empty()
            || cookie
                .max_age()
                .is_some_and(|age| age <= cookie::time::Duration::ZERO);

        let mut jar = self.inner.lock();
        if deleted {
            trace!(cookie = cookie.name(), "Cookie removed");
            jar.remove(Cookie::new(cookie.name().to_string(), ""));
            return None;
        }

        trace!(cookie = cookie.name(), "Cookie stored");
        let stored = Cookie::new(cookie.name().to_string(), cookie.value().to_string());
        jar.add(stored.clone());
        Some(stored)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.lock().get(name).map(|c| c.value().to_string())
    }

    pub fn remove(&self, name: &str) {
        self.inner.lock().remove(Cookie::new(name.to_string(), ""));
    }

    /// `Cookie` request header value, or `None` when empty.
    pub fn header_value(&self) -> Option<String> {
        let jar = self.inner.lock();
        let pairs: Vec<String> = jar
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_header() {
        let jar = CookieJar::new();
        jar.store("sid=abc; Path=/; HttpOnly; SameSite=Lax");
        jar.store("csrf-token=t1; Path=/; SameSite=Strict; Max-Age=3600");

        assert_eq!(jar.get("sid").as_deref(), Some("abc"));
        let header = jar.header_value().unwrap();
        assert!(header.contains("sid=abc"));
        assert!(header.contains("csrf-token=t1"));
    }

    #[test]
    fn test_overwrite_and_delete() {
        let jar = CookieJar::new();
        jar.store("csrf-token=t1");
        jar.store("csrf-token=t2");
        assert_eq!(jar.get("csrf-token").as_deref(), Some("t2"));

        assert!(jar.store("csrf-token=; Max-Age=0").is_none());
        assert_eq!(jar.get("csrf-token"), None);
        assert!(jar.is_empty());
        assert_eq!(jar.header_value(), None);
    }

    #[test]
    fn test_remove() {
        let jar = CookieJar::new();
        jar.store("a=1");
        jar.store("b=2");
        jar.remove("a");
        assert_eq!(jar.header_value().as_deref(), Some("b=2"));
    }

    #[test]
    fn test_garbage_is_ignored() {
        let jar = CookieJar::new();
        assert!(jar.store("no-equals-sign").is_none());
        assert!(jar.is_empty());
    }
}
