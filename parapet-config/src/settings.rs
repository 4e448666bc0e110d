// Layered key/value settings

use crate::{ConfigError, ConfigLoader, EnvLoader, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Deployment environment, read from `PARAPET_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                key: "env".to_string(),
                message: format!("unknown environment '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat settings map with typed accessors.
///
/// Keys are lowercase and prefix-free (`csrf_max_age`). Later layers
/// override earlier ones, so the usual order is file, then `.env`, then the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PARAPET_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self {
            values: EnvLoader::parapet().load(),
        }
    }

    /// Settings from explicit `PARAPET_*` style pairs.
    pub fn from_pairs<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            values: EnvLoader::parapet().load_from(vars),
        }
    }

    /// Full layering: optional config file, `.env` in the working
    /// directory, then the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = Self::new();
        if let Some(path) = config_file {
            settings = settings.merge_file(path)?;
        }
        settings = settings.merge_dotenv(Path::new(".env"))?;
        Ok(settings.merge(Self::from_env()))
    }

    pub fn merge(mut self, other: Settings) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn merge_file(self, path: &Path) -> Result<Self> {
        let values = ConfigLoader::auto(path)?.load_file(path)?;
        info!(path = %path.display(), keys = values.len(), "Loaded configuration file");
        Ok(self.merge(Self { values }))
    }

    /// Merge `PARAPET_*` entries from a dotenv file. A missing file is not
    /// an error.
    pub fn merge_dotenv(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No dotenv file");
            return Ok(self);
        }

        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let mut pairs = Vec::new();
        for item in iter {
            pairs.push(item.map_err(|e| ConfigError::ParseError(e.to_string()))?);
        }

        debug!(path = %path.display(), "Loaded dotenv file");
        Ok(self.merge(Self::from_pairs(pairs)))
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_lowercase(), value.into());
    }

    /// Raw value. Empty strings count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parse a value, `None` when unset.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.get_parsed(key)?.unwrap_or(default))
    }

    /// Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|raw| match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                other => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{}' is not a boolean", other),
                }),
            })
            .transpose()
    }

    /// Comma separated list with blanks dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// `env`, defaulting to development.
    pub fn environment(&self) -> Result<Environment> {
        Ok(self.get_parsed("env")?.unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_typed_accessors() {
        let settings = Settings::from_pairs([
            ("PARAPET_PORT", "8080"),
            ("PARAPET_CSRF_ROTATE", "yes"),
            ("PARAPET_CSRF_EXEMPT", "/api/webhooks/*, /health,"),
            ("PARAPET_CSRF_SECRET", ""),
        ]);

        assert_eq!(settings.get_parsed::<u16>("port").unwrap(), Some(8080));
        assert_eq!(settings.get_bool("csrf_rotate").unwrap(), Some(true));
        assert_eq!(
            settings.get_list("csrf_exempt").unwrap(),
            vec!["/api/webhooks/*", "/health"]
        );
        assert_eq!(settings.get("csrf_secret"), None);
        assert!(settings.require("csrf_secret").is_err());
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let settings = Settings::from_pairs([
            ("PARAPET_PORT", "eighty"),
            ("PARAPET_CSRF_ROTATE", "maybe"),
        ]);

        let err = settings.get_parsed::<u16>("port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "port"));
        assert!(settings.get_bool("csrf_rotate").is_err());
    }

    #[test]
    fn test_environment() {
        assert_eq!(
            Settings::new().environment().unwrap(),
            Environment::Development
        );

        let prod = Settings::from_pairs([("PARAPET_ENV", "Production")]);
        assert!(prod.environment().unwrap().is_production());

        let bad = Settings::from_pairs([("PARAPET_ENV", "staging")]);
        assert!(bad.environment().is_err());
    }

    #[test]
    fn test_merge_order() {
        let base = Settings::from_pairs([("PARAPET_PORT", "3000"), ("PARAPET_ENV", "test")]);
        let merged = base.merge(Settings::from_pairs([("PARAPET_PORT", "4000")]));

        assert_eq!(merged.get("port"), Some("4000"));
        assert_eq!(merged.get("env"), Some("test"));
    }

    #[test]
    fn test_merge_file_and_dotenv() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("parapet.toml");
        std::fs::write(&toml_path, "port = 3000\n[csrf]\nmax_age = 600\n").unwrap();

        let env_path = dir.path().join(".env");
        let mut env_file = std::fs::File::create(&env_path).unwrap();
        writeln!(env_file, "PARAPET_PORT=5000").unwrap();
        writeln!(env_file, "UNRELATED=1").unwrap();

        let settings = Settings::new()
            .merge_file(&toml_path)
            .unwrap()
            .merge_dotenv(&env_path)
            .unwrap();

        assert_eq!(settings.get_parsed::<u16>("port").unwrap(), Some(5000));
        assert_eq!(settings.get_parsed::<u64>("csrf_max_age").unwrap(), Some(600));
        assert!(!settings.contains("unrelated"));
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let settings = Settings::new()
            .merge_dotenv(Path::new("/nonexistent/.env"))
            .unwrap();
        assert!(settings.is_empty());
    }
}
