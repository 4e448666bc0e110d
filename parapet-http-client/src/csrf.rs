//! CSRF-aware request wrapper.
//!
//! [`CsrfClient`] caches the server's CSRF token, attaches it to mutating
//! requests, keeps session and token cookies in a [`CookieJar`], and retries
//! once with a fresh token when the server rejects a stale one.

use crate::{ClientRequest, CookieJar, Response, Result, Transport};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Error code the server puts in the body of a CSRF rejection.
pub const CSRF_REJECTION: &str = "csrf_validation_failed";

/// Where a [`CsrfClient::secure_request`] call is in its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

impl Attempt {
    /// The attempt after a CSRF rejection, or `None` once the retry is spent.
    pub fn next(self) -> Option<Attempt> {
        match self {
            Attempt::First => Some(Attempt::Retried),
            Attempt::Retried => None,
        }
    }
}

/// Endpoint and initial names used before the server has been asked.
#[derive(Debug, Clone)]
pub struct CsrfClientConfig {
    pub token_path: String,
    pub header_name: String,
    pub cookie_name: String,
}

impl Default for CsrfClientConfig {
    fn default() -> Self {
        Self {
            token_path: "/api/csrf-token".to_string(),
            header_name: "x-csrf-token".to_string(),
            cookie_name: "csrf-token".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    csrf_token: String,
    header_name: Option<String>,
    cookie_name: Option<String>,
}

#[derive(Debug)]
struct TokenState {
    token: Option<String>,
    header_name: String,
    cookie_name: String,
}

/// Token cache and secure-request wrapper around a [`Transport`].
pub struct CsrfClient<T: Transport> {
    transport: T,
    token_path: String,
    state: Mutex<TokenState>,
    jar: CookieJar,
}

impl<T: Transport> CsrfClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CsrfClientConfig::default())
    }

    pub fn with_config(transport: T, config: CsrfClientConfig) -> Self {
        Self {
            transport,
            token_path: config.token_path,
            state: Mutex::new(TokenState {
                token: None,
                header_name: config.header_name,
                cookie_name: config.cookie_name,
            }),
            jar: CookieJar::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    pub fn cached_token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// Header name the token is sent under.
    pub fn header_name(&self) -> String {
        self.state.lock().header_name.clone()
    }

    pub fn cookie_name(&self) -> String {
        self.state.lock().cookie_name.clone()
    }

    /// The cached token, or a fresh one from the token endpoint.
    pub async fn get_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!(path = %self.token_path, "Fetching CSRF token");
        let response = self
            .send(ClientRequest::get(self.token_path.clone()))
            .await?
            .error_for_status()?;
        let body: TokenResponse = response.json()?;

        let mut state = self.state.lock();
        if let Some(header_name) = body.header_name {
            state.header_name = header_name;
        }
        if let Some(cookie_name) = body.cookie_name {
            state.cookie_name = cookie_name;
        }
        state.token = Some(body.csrf_token.clone());
        Ok(body.csrf_token)
    }

    /// Send `request`, attaching the CSRF token to mutating methods.
    ///
    /// A CSRF rejection drops the cached token and the request is retried
    /// once with a freshly fetched one. A second rejection is returned as is.
    pub async fn secure_request(&self, request: ClientRequest) -> Result<Response> {
        let mut attempt = Attempt::First;

        loop {
            let mut outgoing = request.clone();
            if outgoing.is_mutating() {
                match self.get_token().await {
                    Ok(token) => outgoing.set_header(self.header_name(), token),
                    Err(err) => warn!(
                        error = %err,
                        path = %outgoing.path,
                        "Could not obtain CSRF token, sending without it"
                    ),
                }
            }

            let response = self.send(outgoing).await?;
            if !is_csrf_rejection(&response) {
                return Ok(response);
            }

            match attempt.next() {
                Some(next) => {
                    info!(path = %request.path, "CSRF token rejected, refreshing and retrying");
                    self.state.lock().token = None;
                    attempt = next;
                }
                None => {
                    warn!(path = %request.path, "CSRF token rejected after refresh");
                    return Ok(response);
                }
            }
        }
    }

    /// Forget the cached token and its cookie, e.g. on logout.
    pub fn clear(&self) {
        let cookie_name = {
            let mut state = self.state.lock();
            state.token = None;
            state.cookie_name.clone()
        };
        self.jar.remove(&cookie_name);
    }

    /// One round trip with the cookie jar applied in both directions.
    async fn send(&self, mut request: ClientRequest) -> Result<Response> {
        if let Some(cookies) = self.jar.header_value() {
            request.set_header("cookie", cookies);
        }

        let response = self.transport.send(request).await?;

        let cookie_name = self.cookie_name();
        for set_cookie in response.set_cookies() {
            match self.jar.store(set_cookie) {
                Some(cookie) if cookie.name() == cookie_name => {
                    self.state.lock().token = Some(cookie.value().to_string());
                }
                None if set_cookie.trim_start().starts_with(&format!("{}=", cookie_name)) => {
                    self.state.lock().token = None;
                }
                _ => {}
            }
        }

        Ok(response)
    }
}

/// 403 with `error == "csrf_validation_failed"` in a JSON body.
pub fn is_csrf_rejection(response: &Response) -> bool {
    if response.status() != http::StatusCode::FORBIDDEN {
        return false;
    }
    response
        .json::<serde_json::Value>()
        .ok()
        .and_then(|body| body.get("error")?.as_str().map(|e| e == CSRF_REJECTION))
        .unwrap_or(false)
}
