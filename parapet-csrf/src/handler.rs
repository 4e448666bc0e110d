// Token retrieval endpoint

use crate::middleware::{IssuedToken, mint};
use crate::token::TokenAuthority;
use parapet_core::{Error, HttpRequest, HttpResponse};
use tracing::warn;

/// `GET` handler returning `{ csrfToken, headerName, cookieName }`.
///
/// Uses the token the middleware issued for this request. If there is none
/// (for example the route was reached with an exempt unsafe method) a token
/// is minted here and its cookie set. Without the CSRF middleware in the
/// chain there is nothing to mint with and the answer is 400.
pub async fn csrf_token_handler(mut req: HttpRequest) -> Result<HttpResponse, Error> {
    if let Some(issued) = req.extensions.get::<IssuedToken>() {
        return HttpResponse::ok().with_json(issued);
    }

    let Some(authority) = req.extensions.get::<TokenAuthority>().cloned() else {
        warn!(path = %req.path, "CSRF token requested but CSRF middleware is not installed");
        return HttpResponse::bad_request().with_json(&serde_json::json!({
            "error": "csrf_unavailable",
            "message": "CSRF protection is not configured for this route",
        }));
    };

    let issued = mint(&authority, &mut req);
    Ok(HttpResponse::ok()
        .with_cookie(&authority.config().token_cookie(&issued.token))
        .with_json(&issued)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsrfConfig;

    fn authority() -> TokenAuthority {
        TokenAuthority::new(CsrfConfig::new(b"test_secret_key_32_bytes_long!!!".to_vec()).unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_returns_issued_token() {
        let mut req = HttpRequest::new("GET", "/api/csrf-token");
        req.extensions.insert(IssuedToken {
            token: "issued".to_string(),
            header_name: "x-csrf-token".to_string(),
            cookie_name: "csrf-token".to_string(),
        });

        let response = csrf_token_handler(req).await.unwrap();
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["csrfToken"], "issued");
        assert!(response.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_mints_when_nothing_issued() {
        let authority = authority();
        let mut req = HttpRequest::new("POST", "/api/csrf-token");
        req.extensions.insert(authority.clone());

        let response = csrf_token_handler(req).await.unwrap();
        assert_eq!(response.status, 200);

        let body: serde_json::Value = response.json().unwrap();
        let token = body["csrfToken"].as_str().unwrap();
        assert!(authority.verify(Some(token), None).is_ok());
        assert_eq!(response.cookie("csrf-token").unwrap().value(), token);
    }

    #[tokio::test]
    async fn test_without_middleware_is_bad_request() {
        let response = csrf_token_handler(HttpRequest::new("GET", "/api/csrf-token"))
            .await
            .unwrap();
        assert_eq!(response.status, 400);
    }
}
