// Error types for the Parapet HTTP runtime

use crate::HttpResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Http(_) | Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => 500,
        }
    }

    /// Stable machine-readable code used in JSON error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::RouteNotFound(_) => "not_found",
            Error::MethodNotAllowed(_) => "method_not_allowed",
            Error::Validation(_) => "validation_failed",
            Error::Deserialization(_) | Error::BadRequest(_) => "bad_request",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Http(_) | Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => {
                "internal_error"
            }
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Render the error as a `{ "error", "message" }` JSON response.
    ///
    /// Server errors never echo their internal message to the caller.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({
            "error": self.error_code(),
            "message": message,
        });

        HttpResponse::new(status)
            .with_json(&body)
            .unwrap_or_else(|_| HttpResponse::internal_server_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::RouteNotFound("/x".into()).status_code(), 404);
        assert_eq!(Error::MethodNotAllowed("PUT /x".into()).status_code(), 405);
        assert_eq!(Error::Validation("email".into()).status_code(), 400);
        assert_eq!(Error::Forbidden("nope".into()).status_code(), 403);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_client_and_server_classification() {
        assert!(Error::BadRequest("x".into()).is_client_error());
        assert!(!Error::BadRequest("x".into()).is_server_error());
        assert!(Error::Internal("x".into()).is_server_error());
    }

    #[test]
    fn test_into_response_hides_internal_details() {
        let response = Error::Internal("database password is hunter2".into()).into_response();
        assert_eq!(response.status, 500);

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_into_response_client_error() {
        let response = Error::Validation("email is required".into()).into_response();
        assert_eq!(response.status, 400);

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["message"], "Validation error: email is required");
    }
}
