//! CsrfClient over the reqwest transport against a mock server

use parapet_http_client::{ClientRequest, CsrfClient, HttpClient, Transport};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_response(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("set-cookie", format!("csrf-token={}; Path=/; SameSite=Strict", token).as_str())
        .set_body_json(json!({
            "csrfToken": token,
            "headerName": "x-csrf-token",
            "cookieName": "csrf-token",
        }))
}

fn rejection() -> ResponseTemplate {
    ResponseTemplate::new(403).set_body_json(json!({
        "error": "csrf_validation_failed",
        "message": "invalid signature",
    }))
}

#[tokio::test]
async fn test_transport_sends_and_collects_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2")
                .set_body_json(json!({ "status": "ok" })),
        )
        .mount(&server)
        .await;

    let client = HttpClient::with_base_url(server.uri()).unwrap();
    let response = client.send(ClientRequest::get("/health")).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.set_cookies().count(), 2);
    assert!(response.url().is_some());
}

#[tokio::test]
async fn test_secure_request_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/csrf-token"))
        .respond_with(token_response("tok-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .and(header("x-csrf-token", "tok-1"))
        .and(header("cookie", "csrf-token=tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(2)
        .mount(&server)
        .await;

    let client = CsrfClient::new(HttpClient::with_base_url(server.uri()).unwrap());
    for _ in 0..2 {
        let response = client
            .secure_request(
                ClientRequest::post("/api/contact")
                    .json(&json!({ "name": "Ann" }))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.is_success());
    }
}

#[tokio::test]
async fn test_stale_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/csrf-token"))
        .respond_with(token_response("stale"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/csrf-token"))
        .respond_with(token_response("fresh"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/inquiry"))
        .and(header("x-csrf-token", "stale"))
        .respond_with(rejection())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/inquiry"))
        .and(header("x-csrf-token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CsrfClient::new(HttpClient::with_base_url(server.uri()).unwrap());
    let response = client
        .secure_request(ClientRequest::post("/api/inquiry"))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(client.cached_token().as_deref(), Some("fresh"));
}
