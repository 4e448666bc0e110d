// Brokerage API wiring

use crate::forms::{ContactForm, InquiryForm, Parsed, parse_form};
use parapet_core::{Application, Error, HttpRequest, HttpResponse, LoggerMiddleware, Router};
use parapet_csrf::{CsrfConfig, CsrfError, CsrfMiddleware, TokenAuthority, csrf_token_handler};
use parapet_session::{SessionConfig, SessionHandle, SessionMiddleware, SessionStore};
use std::sync::Arc;
use tracing::info;

/// Path of the token retrieval endpoint.
pub const CSRF_TOKEN_PATH: &str = "/api/csrf-token";

fn acknowledged() -> Result<HttpResponse, Error> {
    HttpResponse::ok().with_json(&serde_json::json!({ "success": true }))
}

async fn health(_req: HttpRequest) -> Result<HttpResponse, Error> {
    HttpResponse::ok().with_json(&serde_json::json!({ "status": "ok" }))
}

async fn contact(req: HttpRequest) -> Result<HttpResponse, Error> {
    let form = match parse_form::<ContactForm>(&req)? {
        Parsed::Valid(form) => form,
        Parsed::Invalid(response) => return Ok(response),
    };

    info!(
        has_phone = form.phone.is_some(),
        message_len = form.message.len(),
        "Contact form received"
    );
    acknowledged()
}

async fn inquiry(req: HttpRequest) -> Result<HttpResponse, Error> {
    let form = match parse_form::<InquiryForm>(&req)? {
        Parsed::Valid(form) => form,
        Parsed::Invalid(response) => return Ok(response),
    };

    info!(
        kind = ?form.kind,
        property_id = form.property_id.as_deref().unwrap_or("-"),
        "Inquiry received"
    );
    acknowledged()
}

/// Ends the session and withdraws the CSRF cookie. The client is expected
/// to drop its cached token as well.
async fn logout(req: HttpRequest) -> Result<HttpResponse, Error> {
    if let Some(session) = req.extensions.get::<SessionHandle>() {
        info!(session_id = %session.id(), "Session ended");
        session.destroy();
    }

    let mut response = acknowledged()?;
    if let Some(authority) = req.extensions.get::<TokenAuthority>() {
        response.add_cookie(&authority.config().expire_cookie());
    }
    Ok(response)
}

/// Routes without any middleware.
pub fn router() -> Router {
    Router::new()
        .get("/health", health)
        .get(CSRF_TOKEN_PATH, csrf_token_handler)
        .post("/api/contact", contact)
        .post("/api/inquiry", inquiry)
        .post("/api/logout", logout)
}

/// The full application: access log, sessions, then CSRF gating in front of
/// [`router`].
pub fn build_app<S>(
    csrf: CsrfConfig,
    session: SessionConfig,
    store: Arc<S>,
) -> Result<Application, CsrfError>
where
    S: SessionStore + 'static,
{
    Ok(Application::new(router())
        .with_middleware(LoggerMiddleware::new())
        .with_middleware(SessionMiddleware::new(store, session))
        .with_middleware(CsrfMiddleware::new(csrf)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_session::MemorySessionStore;

    fn app() -> Application {
        let csrf = CsrfConfig::new(b"app_test_secret_that_is_32_bytes".to_vec()).unwrap();
        build_app(
            csrf,
            SessionConfig::default(),
            Arc::new(MemorySessionStore::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let response = app().handle(HttpRequest::new("GET", "/health")).await;
        assert_eq!(response.status, 200);
        assert!(response.cookie("csrf-token").is_some());
    }

    #[tokio::test]
    async fn test_contact_requires_token() {
        let request = HttpRequest::new("POST", "/api/contact")
            .with_json(&serde_json::json!({
                "name": "Dana",
                "email": "dana@example.com",
                "message": "hello",
            }))
            .unwrap();

        let response = app().handle(request).await;
        assert_eq!(response.status, 403);
    }

    #[test]
    fn test_router_registers_every_route() {
        let paths: Vec<_> = router()
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method.as_str(), r.path))
            .collect();
        assert_eq!(
            paths,
            vec![
                "GET /health",
                "GET /api/csrf-token",
                "POST /api/contact",
                "POST /api/inquiry",
                "POST /api/logout",
            ]
        );
    }
}
