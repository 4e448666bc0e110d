//! reqwest-backed transport.

use crate::{ClientRequest, HttpClientConfig, HttpClientError, Response, Result, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// HTTP client over a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli);

        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let inner = builder
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Client for `base_url` with default settings.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(HttpClientConfig::builder().base_url(base_url).build())
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Resolve a request path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<url::Url> {
        match &self.config.base_url {
            Some(base) => {
                let base =
                    url::Url::parse(base).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
                base.join(path)
                    .map_err(|e| HttpClientError::InvalidUrl(e.to_string()))
            }
            None => url::Url::parse(path).map_err(|e| HttpClientError::InvalidUrl(e.to_string())),
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: ClientRequest) -> Result<Response> {
        let url = self.resolve(&request.path)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.inner.request(request.method, url);
        for (name, value) in &self.config.default_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = self.inner.execute(builder.build()?).await.map_err(|e| {
            if e.is_timeout() {
                HttpClientError::Timeout(self.config.timeout)
            } else if e.is_connect() {
                HttpClientError::Connection(e.to_string())
            } else {
                HttpClientError::Http(e)
            }
        })?;

        debug!(status = %response.status(), "Response received");
        Response::from_reqwest(response).await
    }
}
