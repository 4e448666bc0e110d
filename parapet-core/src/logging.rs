//! Logging setup for Parapet services.
//!
//! All crates in the workspace log through `tracing` macros with structured
//! fields. This module installs the process-wide subscriber. Output defaults
//! to JSON on stdout so audit events (for example CSRF rejections) can be
//! shipped to a log pipeline unchanged.
//!
//! ```no_run
//! use parapet_core::logging::{LogConfig, LogFormat, LogLevel};
//!
//! LogConfig::from_env()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .expect("logging already initialised");
//! ```
//!
//! # Environment Variables
//!
//! - `PARAPET_LOG_LEVEL=trace|debug|info|warn|error`
//! - `PARAPET_LOG_FORMAT=json|pretty|compact|plain`
//! - `RUST_LOG` takes precedence over the level when set.

use crate::Error;
use std::env;
use tracing_subscriber::EnvFilter;

pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Directive string for `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (default) - structured, machine-readable
    Json,
    /// Plain text format
    Plain,
    /// Multi-line, human oriented
    Pretty,
    /// Single line, minimal
    Compact,
}

impl LogFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub with_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            with_targets: true,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `PARAPET_LOG_LEVEL` / `PARAPET_LOG_FORMAT`.
    /// Unrecognised values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = env::var("PARAPET_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::from_str(&s))
        {
            config.level = level;
        }
        if let Some(format) = env::var("PARAPET_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::from_str(&s))
        {
            config.format = format;
        }
        config
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// Install the global subscriber.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init(&self) -> Result<(), Error> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(self.with_targets);

        let result = match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Plain => builder.try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
        };

        result.map_err(|e| Error::Internal(format!("failed to initialise logging: {}", e)))
    }
}
