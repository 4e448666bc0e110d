// Server process configuration

use parapet_config::{ConfigError, ConfigValidator, Environment, Settings, Validate};
use parapet_csrf::{CsrfConfig, CsrfError};
use parapet_session::{SessionConfig, SessionError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;

/// Errors that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("CSRF configuration: {0}")]
    Csrf(#[from] CsrfError),

    #[error("session configuration: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Runtime(#[from] parapet_core::Error),
}

/// Listener settings. Keys: `host`, `port`, `env`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let config = Self {
            host: settings.get_or("host", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: settings.get_or("port", DEFAULT_PORT)?,
            environment: settings.environment()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> parapet_config::Result<()> {
        ConfigValidator::is_port(self.port, "port")
    }
}

/// Everything the server binary needs, read from one [`Settings`].
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub server: ServerConfig,
    pub csrf: CsrfConfig,
    pub session: SessionConfig,
}

impl AppSettings {
    pub fn from_settings(settings: &Settings) -> Result<Self, ServerError> {
        Ok(Self {
            server: ServerConfig::from_settings(settings)?,
            csrf: CsrfConfig::from_settings(settings)?,
            session: SessionConfig::from_settings(settings)?,
        })
    }
}
