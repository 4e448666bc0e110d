// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Reads `PREFIX_*` variables into a flat, lowercase key map.
///
/// `PARAPET_CSRF_MAX_AGE=600` becomes `csrf_max_age = "600"` when the prefix
/// is `PARAPET`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `PARAPET_` namespace.
    pub fn parapet() -> Self {
        Self::new(Some("PARAPET".to_string()))
    }

    /// Load matching variables from the process environment.
    pub fn load(&self) -> HashMap<String, String> {
        self.load_from(env::vars())
    }

    /// Load matching variables from an explicit list of pairs.
    ///
    /// Tests use this instead of mutating the process environment.
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            if let Some(name) = self.strip(key.as_ref()) {
                config.insert(name, value.into());
            }
        }

        config
    }

    /// Load a single variable, e.g. `load_var("csrf_secret")` reads
    /// `PARAPET_CSRF_SECRET`.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        env::var(&full_key).map_err(|_| ConfigError::KeyNotFound(full_key))
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// The environment variable name for `key`.
    pub fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    fn strip(&self, key: &str) -> Option<String> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(str::to_lowercase),
            None => Some(key.to_lowercase()),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
