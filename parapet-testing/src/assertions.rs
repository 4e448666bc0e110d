// Test assertions for HTTP responses

use parapet_core::HttpResponse;

/// Assert that a response has a specific status code
pub fn assert_status(response: &HttpResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        String::from_utf8_lossy(&response.body)
    );
}

/// Assert that a response body is JSON equal to `expected`
pub fn assert_json(response: &HttpResponse, expected: &serde_json::Value) {
    let actual: serde_json::Value = response
        .json()
        .expect("Failed to deserialize response body");
    assert_eq!(&actual, expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &HttpResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &HttpResponse, expected: &str) {
    let body = String::from_utf8_lossy(&response.body);
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response is successful (2xx status)
pub fn assert_success(response: &HttpResponse) {
    assert!(
        response.is_success(),
        "Expected successful status (2xx), got {}",
        response.status
    );
}

/// Assert a 403 CSRF rejection whose message is `reason`.
pub fn assert_csrf_rejected(response: &HttpResponse, reason: &str) {
    assert_status(response, 403);
    let body: serde_json::Value = response
        .json()
        .expect("CSRF rejection body is not JSON");
    assert_eq!(body["error"], "csrf_validation_failed");
    assert_eq!(body["message"], reason, "Unexpected rejection reason");
}

/// Assert that the response sets `name`, returning its value.
pub fn assert_sets_cookie(response: &HttpResponse, name: &str) -> String {
    match response.cookie(name) {
        Some(cookie) => cookie.value().to_string(),
        None => panic!(
            "Expected Set-Cookie for '{}', got {:?}",
            name, response.cookies
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_core::Cookie;

    #[test]
    fn test_assert_csrf_rejected() {
        let response = HttpResponse::forbidden()
            .with_json(&serde_json::json!({
                "error": "csrf_validation_failed",
                "message": "expired",
            }))
            .unwrap();
        assert_csrf_rejected(&response, "expired");
    }

    #[test]
    #[should_panic(expected = "Expected status 403")]
    fn test_assert_csrf_rejected_wrong_status() {
        assert_csrf_rejected(&HttpResponse::ok(), "expired");
    }

    #[test]
    fn test_assert_sets_cookie() {
        let response = HttpResponse::ok().with_cookie(&Cookie::new("csrf-token", "abc"));
        assert_eq!(assert_sets_cookie(&response, "csrf-token"), "abc");
    }

    #[test]
    fn test_assert_body_contains() {
        let response = HttpResponse::ok().with_body(b"{\"success\":true}".to_vec());
        assert_body_contains(&response, "success");
        assert_success(&response);
    }
}
