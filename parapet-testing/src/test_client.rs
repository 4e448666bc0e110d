// In-process test client

use parapet_core::{Application, Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sends requests straight into an [`Application`], middleware included.
pub struct TestClient {
    app: Arc<Application>,
}

impl TestClient {
    pub fn new(app: Application) -> Self {
        Self { app: Arc::new(app) }
    }

    pub fn from_arc(app: Arc<Application>) -> Self {
        Self { app }
    }

    pub async fn get(&self, path: &str) -> HttpResponse {
        self.send(TestRequestBuilder::new(HttpMethod::GET, path).build())
            .await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> HttpResponse {
        self.send(TestRequestBuilder::new(HttpMethod::POST, path).body(body).build())
            .await
    }

    pub async fn delete(&self, path: &str) -> HttpResponse {
        self.send(TestRequestBuilder::new(HttpMethod::DELETE, path).build())
            .await
    }

    pub async fn send(&self, request: HttpRequest) -> HttpResponse {
        self.app.handle(request).await
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Vec<u8>,
    query_params: BTreeMap<String, String>,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: Vec::new(),
            query_params: BTreeMap::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Send every cookie a response set, as a browser would on the next
    /// request.
    pub fn cookies_from(mut self, response: &HttpResponse) -> Self {
        for raw in &response.cookies {
            if let Ok(cookie) = parapet_core::Cookie::parse(raw.as_str()) {
                self.cookies
                    .push((cookie.name().to_string(), cookie.value().to_string()));
            }
        }
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn json<T: serde::Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> HttpRequest {
        let query_string = if self.query_params.is_empty() {
            String::new()
        } else {
            let params: Vec<String> = self
                .query_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            format!("?{}", params.join("&"))
        };

        let mut request = HttpRequest::new(self.method.as_str(), format!("{}{}", self.path, query_string))
            .with_body(self.body);
        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.with_header("cookie", cookie);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_core::{Cookie, Router};

    #[test]
    fn test_request_builder() {
        let req = TestRequestBuilder::new(HttpMethod::POST, "/api/contact")
            .header("X-CSRF-Token", "tok")
            .cookie("sid", "s1")
            .cookie("csrf-token", "tok")
            .query("_csrf", "a b")
            .build();

        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/contact");
        assert_eq!(req.header("x-csrf-token"), Some("tok"));
        assert_eq!(req.cookie("sid").as_deref(), Some("s1"));
        assert_eq!(req.query("_csrf").map(String::as_str), Some("a b"));
    }

    #[tokio::test]
    async fn test_cookies_from_response() {
        let router = Router::new().get("/", |req| async move {
            let seen = req.cookie("sid").unwrap_or_default();
            Ok(HttpResponse::ok()
                .with_cookie(&Cookie::new("sid", "s2"))
                .with_body(seen.into_bytes()))
        });
        let client = TestClient::new(Application::new(router));

        let first = client.get("/").await;
        let second = client
            .send(
                TestRequestBuilder::new(HttpMethod::GET, "/")
                    .cookies_from(&first)
                    .build(),
            )
            .await;

        assert_eq!(second.body, b"s2");
    }
}
