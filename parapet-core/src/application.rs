// Application runtime and HTTP server

use crate::routing::HandlerFn;
use crate::{Error, HttpRequest, HttpResponse, Middleware, MiddlewareChain, Router};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// A router plus the middleware that wraps every request to it.
pub struct Application {
    router: Arc<Router>,
    middleware: MiddlewareChain,
}

impl Application {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Append a middleware. Middleware runs in registration order.
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.use_middleware(middleware);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run a request through the middleware chain and router.
    ///
    /// Errors are rendered into their JSON response here, so callers always
    /// receive a response.
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let router = self.router.clone();
        let handler: HandlerFn = Arc::new(move |req| {
            let router = router.clone();
            Box::pin(async move { router.route(req).await })
        });

        match self.middleware.apply(req, handler).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    error!(error = %err, "Request handler failed");
                } else {
                    debug!(error = %err, status = err.status_code(), "Request rejected");
                }
                err.into_response()
            }
        }
    }

    /// Bind `addr` and serve until the process exits.
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Server listening");

        let app = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let app = app.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let app = app.clone();
                    async move { handle_request(req, app, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(error = %err, remote = %remote_addr, "Error serving connection");
                }
            });
        }
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    app: Arc<Application>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request =
        HttpRequest::new(req.method().as_str(), target).with_remote_addr(remote_addr);

    for (name, value) in req.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let separator = if name == hyper::header::COOKIE { "; " } else { ", " };
        request
            .headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    request.body = req.collect().await?.to_bytes().to_vec();

    let response = app.handle(request).await;
    Ok(into_hyper_response(response))
}

fn into_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);

    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    for cookie in &response.cookies {
        builder = builder.header(hyper::header::SET_COOKIE, cookie.as_str());
    }

    match builder.body(Full::new(Bytes::from(response.body))) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Failed to build HTTP response");
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Next;
    use async_trait::async_trait;

    struct AddHeader;

    #[async_trait]
    impl Middleware for AddHeader {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
            let mut response = next(req).await?;
            response
                .headers
                .insert("X-Test".to_string(), "yes".to_string());
            Ok(response)
        }
    }

    fn app() -> Application {
        let router = Router::new()
            .get("/health", |_req| async {
                HttpResponse::ok().with_json(&serde_json::json!({"status": "ok"}))
            })
            .post("/fail", |_req| async {
                Err(Error::Validation("name is required".into()))
            });
        Application::new(router).with_middleware(AddHeader)
    }

    #[tokio::test]
    async fn test_handle_runs_middleware_and_router() {
        let response = app().handle(HttpRequest::new("GET", "/health")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.header("x-test"), Some("yes"));
    }

    #[tokio::test]
    async fn test_handle_renders_errors() {
        let response = app().handle(HttpRequest::new("POST", "/fail")).await;
        assert_eq!(response.status, 400);

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_handle_unknown_route() {
        let response = app().handle(HttpRequest::new("GET", "/missing")).await;
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_into_hyper_response_keeps_every_cookie() {
        let mut response = HttpResponse::ok();
        response.cookies.push("a=1; Path=/".to_string());
        response.cookies.push("b=2; Path=/".to_string());

        let converted = into_hyper_response(response);
        let cookies: Vec<_> = converted
            .headers()
            .get_all(hyper::header::SET_COOKIE)
            .iter()
            .collect();
        assert_eq!(cookies.len(), 2);
    }
}
