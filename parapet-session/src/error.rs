//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session expired: {0}")]
    Expired(String),

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Other(String),
}

impl From<parapet_config::ConfigError> for SessionError {
    fn from(err: parapet_config::ConfigError) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<SessionError> for parapet_core::Error {
    fn from(err: SessionError) -> Self {
        parapet_core::Error::Internal(err.to_string())
    }
}
