//! Transport-independent request.

use crate::{HttpClientError, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use tracing::debug;

/// A request to be sent through a [`Transport`](crate::Transport).
///
/// `path` is either an absolute URL or a path resolved against the
/// transport's base URL.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ClientRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Set a header, replacing any previous value. Invalid names or values
    /// are dropped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        match (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!(header = name.as_ref(), "Dropping invalid request header"),
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = serde_json::to_vec(value).map_err(|e| HttpClientError::Json(e.to_string()))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// URL-encoded form body with a matching content type.
    pub fn form<T: Serialize>(mut self, value: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(value)
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
        self.body = encoded.into_bytes();
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Ok(self)
    }

    /// `POST`, `PUT`, `PATCH` and `DELETE` change server state and carry a
    /// CSRF token.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_methods() {
        assert!(ClientRequest::post("/a").is_mutating());
        assert!(ClientRequest::put("/a").is_mutating());
        assert!(ClientRequest::patch("/a").is_mutating());
        assert!(ClientRequest::delete("/a").is_mutating());
        assert!(!ClientRequest::get("/a").is_mutating());
        assert!(!ClientRequest::new(Method::HEAD, "/a").is_mutating());
    }

    #[test]
    fn test_headers_replace_and_skip_invalid() {
        let request = ClientRequest::get("/")
            .header("X-CSRF-Token", "one")
            .header("x-csrf-token", "two")
            .header("bad header", "x");

        assert_eq!(request.header_value("x-csrf-token"), Some("two"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_json_and_form_bodies() {
        let json = ClientRequest::post("/api/contact")
            .json(&serde_json::json!({ "name": "Ann" }))
            .unwrap();
        assert_eq!(json.header_value("content-type"), Some("application/json"));
        assert_eq!(json.body, br#"{"name":"Ann"}"#);

        let form = ClientRequest::post("/api/contact")
            .form(&[("name", "Ann Lee")])
            .unwrap();
        assert_eq!(form.body, b"name=Ann+Lee");
    }
}
