use thiserror::Error;

/// Why a token was refused, or why the CSRF layer could not be configured.
///
/// The `Display` text of the verification variants is the `message` sent to
/// clients in the 403 body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[error("no token provided")]
    MissingToken,

    #[error("invalid format")]
    MalformedToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("session mismatch")]
    SessionMismatch,

    #[error("expired")]
    Expired,

    #[error("CSRF secret must be at least {min} bytes (got {actual})")]
    WeakSecret { min: usize, actual: usize },

    #[error("PARAPET_CSRF_SECRET must be set when PARAPET_ENV=production")]
    MissingSecret,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CsrfError {
    /// True for the variants `verify` can return.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            CsrfError::MissingToken
                | CsrfError::MalformedToken
                | CsrfError::InvalidSignature
                | CsrfError::SessionMismatch
                | CsrfError::Expired
        )
    }

    /// Stable identifier for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CsrfError::MissingToken => "missing_token",
            CsrfError::MalformedToken => "malformed_token",
            CsrfError::InvalidSignature => "invalid_signature",
            CsrfError::SessionMismatch => "session_mismatch",
            CsrfError::Expired => "expired",
            CsrfError::WeakSecret { .. } => "weak_secret",
            CsrfError::MissingSecret => "missing_secret",
            CsrfError::Config(_) => "config",
        }
    }
}

impl From<parapet_config::ConfigError> for CsrfError {
    fn from(err: parapet_config::ConfigError) -> Self {
        CsrfError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
