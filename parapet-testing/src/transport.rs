//! A [`Transport`] that hands requests straight to an [`Application`].
//!
//! Lets a [`CsrfClient`](parapet_http_client::CsrfClient) talk to a server
//! without a socket. The application can be swapped mid-test, which is how
//! tests simulate a server restart with a rotated secret.

use async_trait::async_trait;
use parapet_core::{Application, HttpRequest, HttpResponse};
use parapet_http_client::{ClientRequest, HttpClientError, Response, Result, Transport};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// One request/response pair seen by an [`InProcessTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub method: String,
    pub path: String,
    pub status: u16,
}

pub struct InProcessTransport {
    app: RwLock<Arc<Application>>,
    sent: AtomicUsize,
    log: Mutex<Vec<Exchange>>,
}

impl InProcessTransport {
    pub fn new(app: Application) -> Self {
        Self {
            app: RwLock::new(Arc::new(app)),
            sent: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Swap the application behind this transport. Requests already in
    /// flight finish against the old one.
    pub fn replace_app(&self, app: Application) {
        *self.app.write() = Arc::new(app);
    }

    /// Number of requests sent so far.
    pub fn requests(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.lock().clone()
    }

    /// Exchanges whose method and path match.
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|e| e.method == method && e.path == path)
            .count()
    }
}

/// Reduce an absolute URL to its path and query.
fn request_target(path: &str) -> Result<String> {
    if path.starts_with('/') {
        return Ok(path.to_string());
    }
    let url = url::Url::parse(path)?;
    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

fn to_server_request(request: ClientRequest) -> Result<HttpRequest> {
    let target = request_target(&request.path)?;
    let mut converted = HttpRequest::new(request.method.as_str(), target).with_body(request.body);

    for (name, value) in request.headers.iter() {
        let value = value
            .to_str()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
        converted = converted.with_header(name.as_str(), value);
    }
    Ok(converted)
}

fn to_client_response(response: HttpResponse) -> Result<Response> {
    let headers = response
        .headers
        .into_iter()
        .chain(
            response
                .cookies
                .into_iter()
                .map(|cookie| ("set-cookie".to_string(), cookie)),
        );
    Response::from_parts(response.status, headers, response.body)
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: ClientRequest) -> Result<Response> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let app = self.app.read().clone();

        let method = request.method.to_string();
        let request = to_server_request(request)?;
        let path = request.path.clone();

        let response = app.handle(request).await;
        trace!(method = %method, path = %path, status = response.status, "In-process exchange");

        self.log.lock().push(Exchange {
            method,
            path,
            status: response.status,
        });
        to_client_response(response)
    }
}
