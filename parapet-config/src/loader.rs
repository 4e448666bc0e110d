// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format from a path. Bare `.env` files count as `Env`.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Loads a configuration file into the same flat key space the environment
/// loader produces.
///
/// Nested tables are joined with `_`, so
///
/// ```toml
/// [csrf]
/// max_age = 600
/// ```
///
/// yields `csrf_max_age = "600"`, the same key `PARAPET_CSRF_MAX_AGE` maps to.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the loader from the file extension.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported config file: {}", path.display()))
        })?;
        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
        let content = fs::read_to_string(path.as_ref())?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<HashMap<String, String>> {
        match self.format {
            FileFormat::Json => {
                let value: Value = serde_json::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?;
                flatten_root(value)
            }
            FileFormat::Toml => {
                let value: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
                let value = serde_json::to_value(value)
                    .map_err(|e| ConfigError::ParseError(format!("TOML conversion error: {}", e)))?;
                flatten_root(value)
            }
            FileFormat::Env => parse_env(content),
        }
    }
}

fn parse_env(content: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) =
            item.map_err(|e| ConfigError::ParseError(format!("env parse error: {}", e)))?;
        map.insert(key.to_lowercase(), value);
    }
    Ok(map)
}

fn flatten_root(value: Value) -> Result<HashMap<String, String>> {
    let Value::Object(object) = value else {
        return Err(ConfigError::ParseError(
            "top level of a config file must be a table".to_string(),
        ));
    };

    let mut map = HashMap::new();
    for (key, value) in object {
        flatten_into(&mut map, key.to_lowercase(), value);
    }
    Ok(map)
}

fn flatten_into(map: &mut HashMap<String, String>, prefix: String, value: Value) {
    match value {
        Value::Object(object) => {
            for (key, value) in object {
                flatten_into(map, format!("{}_{}", prefix, key.to_lowercase()), value);
            }
        }
        // Lists become comma separated, matching how list-valued env vars are written.
        Value::Array(items) => {
            let joined = items
                .into_iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            map.insert(prefix, joined);
        }
        Value::Null => {}
        other => {
            map.insert(prefix, scalar_to_string(other));
        }
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_flattens() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let map = loader
            .parse(r#"{"port": 8080, "csrf": {"rotate": true, "cookie_name": "csrf-token"}}"#)
            .unwrap();

        assert_eq!(map.get("port"), Some(&"8080".to_string()));
        assert_eq!(map.get("csrf_rotate"), Some(&"true".to_string()));
        assert_eq!(map.get("csrf_cookie_name"), Some(&"csrf-token".to_string()));
    }

    #[test]
    fn test_parse_toml_lists() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let map = loader
            .parse(
                r#"
                env = "production"

                [csrf]
                max_age = 600
                exempt = ["/api/webhooks/*", "/health"]
                "#,
            )
            .unwrap();

        assert_eq!(map.get("env"), Some(&"production".to_string()));
        assert_eq!(map.get("csrf_max_age"), Some(&"600".to_string()));
        assert_eq!(
            map.get("csrf_exempt"),
            Some(&"/api/webhooks/*,/health".to_string())
        );
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let map = loader
            .parse("PORT=3000\n# comment\nCSRF_SECRET=\"quoted value\"\n")
            .unwrap();

        assert_eq!(map.get("port"), Some(&"3000".to_string()));
        assert_eq!(map.get("csrf_secret"), Some(&"quoted value".to_string()));
    }

    #[test]
    fn test_rejects_non_table_root() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(loader.parse("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_path(Path::new(".env")), Some(FileFormat::Env));
        assert_eq!(
            FileFormat::from_path(Path::new("config/parapet.toml")),
            Some(FileFormat::Toml)
        );
        assert!(ConfigLoader::auto("parapet.yaml").is_err());
    }
}
