//! HTTP response wrapper.

use crate::{HttpClientError, Result};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    url: Option<url::Url>,
}

impl Response {
    /// Create a response from a reqwest response.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            body,
            url: Some(url),
        })
    }

    /// Build a response from raw parts, for transports that do not go over
    /// the network. Header pairs with invalid names or values are skipped.
    pub fn from_parts<I, K, V>(status: u16, headers: I, body: impl Into<Bytes>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let status = StatusCode::from_u16(status)
            .map_err(|e| HttpClientError::Transport(e.to_string()))?;

        let mut map = HeaderMap::new();
        for (name, value) in headers {
            match (
                HeaderName::try_from(name.as_ref()),
                HeaderValue::try_from(value.as_ref()),
            ) {
                (Ok(name), Ok(value)) => {
                    map.append(name, value);
                }
                _ => debug!(header = name.as_ref(), "Skipping invalid response header"),
            }
        }

        Ok(Self {
            status,
            headers: map,
            body: body.into(),
            url: None,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Every `Set-Cookie` value, in order.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// The final URL, for network responses.
    pub fn url(&self) -> Option<&url::Url> {
        self.url.as_ref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| HttpClientError::Json(e.to_string()))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| HttpClientError::Json(e.to_string()))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Turn 4xx and 5xx responses into [`HttpClientError::Response`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            let message = self.text().unwrap_or_else(|_| "Unknown error".to_string());
            Err(HttpClientError::Response {
                status: self.status.as_u16(),
                message,
            })
        } else {
            Ok(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_keeps_repeated_cookies() {
        let response = Response::from_parts(
            200,
            [
                ("set-cookie", "a=1; Path=/"),
                ("set-cookie", "b=2; Path=/"),
                ("content-type", "application/json"),
                ("bad name", "x"),
            ],
            r#"{"ok":true}"#,
        )
        .unwrap();

        assert_eq!(response.set_cookies().count(), 2);
        assert_eq!(response.content_type(), Some("application/json"));
        assert!(response.url().is_none());

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_error_for_status() {
        let ok = Response::from_parts(204, Vec::<(&str, &str)>::new(), Bytes::new()).unwrap();
        assert!(ok.error_for_status().is_ok());

        let forbidden =
            Response::from_parts(403, Vec::<(&str, &str)>::new(), "denied").unwrap();
        let err = forbidden.error_for_status().unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn test_invalid_status_rejected() {
        assert!(Response::from_parts(1000, Vec::<(&str, &str)>::new(), Bytes::new()).is_err());
    }
}
