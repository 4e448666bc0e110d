//! Session configuration.

use crate::error::SessionResult;
use parapet_config::{ConfigValidator, Settings, Validate};
use parapet_core::SameSite;
use std::time::Duration;

/// Cookie and lifetime settings for [`SessionMiddleware`](crate::SessionMiddleware).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the session id cookie.
    pub cookie_name: String,
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    /// How often expired sessions are swept from the store.
    pub cleanup_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            default_ttl: Duration::from_secs(86400),
            max_ttl: Duration::from_secs(86400 * 7),
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `session_ttl` and `session_cleanup_interval`
    /// (both in seconds) and `session_cookie`.
    /// Production deployments get `Secure` cookies.
    pub fn from_settings(settings: &Settings) -> SessionResult<Self> {
        let mut config = Self::default();
        if let Some(ttl) = settings.get_parsed::<u64>("session_ttl")? {
            config.default_ttl = Duration::from_secs(ttl);
        }
        if let Some(every) = settings.get_parsed::<u64>("session_cleanup_interval")? {
            config.cleanup_interval = Duration::from_secs(every);
        }
        if let Some(name) = settings.get("session_cookie") {
            config.cookie_name = name.to_string();
        }
        config.secure = settings.environment()?.is_production();
        config.validate()?;
        Ok(config)
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, every: Duration) -> Self {
        self.cleanup_interval = every;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// TTL clamped to `max_ttl`.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_ttl).min(self.max_ttl)
    }
}

impl Validate for SessionConfig {
    fn validate(&self) -> parapet_config::Result<()> {
        ConfigValidator::not_empty(&self.cookie_name, "session cookie name")?;
        ConfigValidator::in_range(
            self.default_ttl.as_secs(),
            1,
            self.max_ttl.as_secs(),
            "session ttl",
        )?;
        ConfigValidator::in_range(
            self.cleanup_interval.as_secs(),
            1,
            86400,
            "session cleanup interval",
        )
    }
}
