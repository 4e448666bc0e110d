use crate::config::CsrfConfig;
use crate::error::CsrfError;
use crate::token::{Clock, CsrfToken, TokenAuthority};
use async_trait::async_trait;
use parapet_core::{Cookie, Error, HttpRequest, HttpResponse, Middleware, Next};
use parapet_session::SessionHandle;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Session key mirroring the most recently issued token.
pub const SESSION_TOKEN_KEY: &str = "csrf_token";

/// Error code in the 403 body.
pub const REJECTION_ERROR: &str = "csrf_validation_failed";

/// Token issued while handling the current request, available to handlers
/// through the request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    #[serde(rename = "csrfToken")]
    pub token: String,
    pub header_name: String,
    pub cookie_name: String,
}

/// CSRF protection middleware.
///
/// Safe methods get a fresh token (cookie, session mirror and
/// [`IssuedToken`] extension). Unsafe methods on non-exempt paths must
/// present a valid token or are answered with 403.
#[derive(Clone)]
pub struct CsrfMiddleware {
    authority: TokenAuthority,
}

impl CsrfMiddleware {
    pub fn new(config: CsrfConfig) -> Result<Self, CsrfError> {
        Ok(Self {
            authority: TokenAuthority::new(config)?,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.authority = self.authority.with_clock(clock);
        self
    }

    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    pub fn config(&self) -> &CsrfConfig {
        self.authority.config()
    }

    /// Whether `request` has to carry a valid token.
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        !self.config().is_safe_method(&request.method) && !self.config().is_exempt(&request.path)
    }

    /// Token from the header, then the body fields, then the query string.
    pub fn extract_token(&self, request: &HttpRequest) -> Option<String> {
        self.token_from_header(request)
            .or_else(|| self.token_from_body(request))
            .or_else(|| self.token_from_query(request))
    }

    /// Extract and verify the request's token against its session.
    pub fn validate_request(&self, request: &HttpRequest) -> Result<CsrfToken, CsrfError> {
        let token = self.extract_token(request);
        self.authority
            .verify(token.as_deref(), session_id(request).as_deref())
    }

    /// `Set-Cookie` that removes the token cookie, for logout responses.
    pub fn expire_cookie(&self) -> Cookie<'static> {
        self.config().expire_cookie()
    }

    /// Set the cookie for a token minted on the way in. Skipped when the
    /// handler ended the session or already set the token cookie itself,
    /// so a logout's expiring cookie is the last word. Also skipped when the
    /// session was started by a failed request, as it is not persisted.
    fn attach_token(
        &self,
        response: &mut HttpResponse,
        issued: &IssuedToken,
        session: Option<&SessionHandle>,
    ) -> bool {
        let cookie_name = &self.config().cookie_name;
        if session.is_some_and(SessionHandle::is_destroyed) || response.cookie(cookie_name).is_some()
        {
            debug!(cookie = %cookie_name, "Response settles the CSRF cookie, not attaching a token");
            return false;
        }
        if session.is_some_and(SessionHandle::is_new) && response.status >= 400 {
            debug!(status = response.status, "Failed request on a new session, not attaching a token");
            return false;
        }
        response.add_cookie(&self.config().token_cookie(&issued.token));
        true
    }

    fn token_from_header(&self, request: &HttpRequest) -> Option<String> {
        request
            .header(&self.config().header_name)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn token_from_body(&self, request: &HttpRequest) -> Option<String> {
        if request.body.is_empty() {
            return None;
        }
        let fields = &self.config().field_names;

        if let Ok(serde_json::Value::Object(json)) =
            serde_json::from_slice::<serde_json::Value>(&request.body)
        {
            return fields
                .iter()
                .filter_map(|name| json.get(name).and_then(|v| v.as_str()))
                .find(|t| !t.is_empty())
                .map(str::to_string);
        }

        let form = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&request.body).ok()?;
        fields.iter().find_map(|name| {
            form.iter()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.clone())
        })
    }

    fn token_from_query(&self, request: &HttpRequest) -> Option<String> {
        request
            .query(&self.config().query_param)
            .filter(|t| !t.is_empty())
            .cloned()
    }

    fn reject(&self, request: &HttpRequest, err: &CsrfError) -> Result<HttpResponse, Error> {
        warn!(
            method = %request.method,
            path = %request.path,
            client_ip = request.client_ip().as_deref().unwrap_or("unknown"),
            forwarded_for = request.forwarded_for().unwrap_or("none"),
            user_agent = request.user_agent().unwrap_or("unknown"),
            session_id = session_id(request).as_deref().unwrap_or("none"),
            reason = err.kind(),
            "CSRF validation failed"
        );

        HttpResponse::forbidden().with_json(&serde_json::json!({
            "error": REJECTION_ERROR,
            "message": err.to_string(),
        }))
    }
}

/// Issue a token for the request's session, mirror it into the session and
/// expose it as an [`IssuedToken`] extension.
pub(crate) fn mint(authority: &TokenAuthority, request: &mut HttpRequest) -> IssuedToken {
    let session = request.extensions.get::<SessionHandle>().cloned();
    let binding = session.as_ref().map(SessionHandle::id);
    let token = authority.issue(binding.as_deref());

    if let Some(session) = &session
        && let Err(err) = session.set(SESSION_TOKEN_KEY, &token)
    {
        warn!(error = %err, "Failed to mirror CSRF token into session");
    }

    let issued = IssuedToken {
        token,
        header_name: authority.config().header_name.clone(),
        cookie_name: authority.config().cookie_name.clone(),
    };
    request.extensions.insert(issued.clone());
    issued
}

fn session_id(request: &HttpRequest) -> Option<String> {
    request.extensions.get::<SessionHandle>().map(SessionHandle::id)
}

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        req.extensions.insert(self.authority.clone());

        let session = req.extensions.get::<SessionHandle>().cloned();

        if self.config().is_safe_method(&req.method) {
            let issued = mint(&self.authority, &mut req);
            let mut response = next(req).await?;
            self.attach_token(&mut response, &issued, session.as_ref());
            return Ok(response);
        }

        if let Some(pattern) = self.config().exempt_match(&req.path) {
            debug!(path = %req.path, pattern, "CSRF exempt path");
            return next(req).await;
        }

        if let Err(err) = self.validate_request(&req) {
            return self.reject(&req, &err);
        }

        if !self.config().rotate_after_verify {
            return next(req).await;
        }

        let issued = mint(&self.authority, &mut req);
        let mut response = next(req).await?;
        if self.attach_token(&mut response, &issued, session.as_ref()) {
            debug!("CSRF token rotated");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn middleware() -> CsrfMiddleware {
        let config = CsrfConfig::new(b"test_secret_key_32_bytes_long!!!".to_vec())
            .unwrap()
            .with_exempt_paths(vec!["/api/csrf-token".to_string(), "/hooks/*".to_string()]);
        CsrfMiddleware::new(config).unwrap()
    }

    #[test]
    fn test_needs_protection() {
        let csrf = middleware();
        assert!(!csrf.needs_protection(&HttpRequest::new("GET", "/api/contact")));
        assert!(!csrf.needs_protection(&HttpRequest::new("OPTIONS", "/api/contact")));
        assert!(!csrf.needs_protection(&HttpRequest::new("POST", "/hooks/stripe")));
        assert!(csrf.needs_protection(&HttpRequest::new("POST", "/api/contact")));
        assert!(csrf.needs_protection(&HttpRequest::new("DELETE", "/api/contact")));
    }

    #[test]
    fn test_extraction_priority() {
        let csrf = middleware();
        let all = HttpRequest::new("POST", "/api/contact?_csrf=from-query")
            .with_header("X-CSRF-Token", "from-header")
            .with_body(r#"{"_csrf":"from-body"}"#);
        assert_eq!(csrf.extract_token(&all).as_deref(), Some("from-header"));

        let body_and_query = HttpRequest::new("POST", "/api/contact?_csrf=from-query")
            .with_body("name=Ann&csrfToken=from-form");
        assert_eq!(
            csrf.extract_token(&body_and_query).as_deref(),
            Some("from-form")
        );

        let query_only = HttpRequest::new("POST", "/api/contact?_csrf=from-query")
            .with_body(r#"{"name":"Ann"}"#);
        assert_eq!(
            csrf.extract_token(&query_only).as_deref(),
            Some("from-query")
        );

        assert_eq!(csrf.extract_token(&HttpRequest::new("POST", "/")), None);
    }

    #[test]
    fn test_body_field_order() {
        let csrf = middleware();
        let req = HttpRequest::new("POST", "/")
            .with_body(r#"{"csrfToken":"second","_csrf":"first"}"#);
        assert_eq!(csrf.extract_token(&req).as_deref(), Some("first"));
    }

    #[test]
    fn test_validate_request() {
        let csrf = middleware();
        let token = csrf.authority().issue(None);

        let ok = HttpRequest::new("POST", "/api/contact").with_header("x-csrf-token", token);
        assert!(csrf.validate_request(&ok).is_ok());

        let missing = HttpRequest::new("POST", "/api/contact");
        assert_eq!(
            csrf.validate_request(&missing),
            Err(CsrfError::MissingToken)
        );
    }

    #[test]
    fn test_issued_token_serializes_camel_case() {
        let issued = IssuedToken {
            token: "t".to_string(),
            header_name: "x-csrf-token".to_string(),
            cookie_name: "csrf-token".to_string(),
        };
        let json = serde_json::to_value(&issued).unwrap();
        assert_eq!(json["csrfToken"], "t");
        assert_eq!(json["headerName"], "x-csrf-token");
        assert_eq!(json["cookieName"], "csrf-token");
    }
}
