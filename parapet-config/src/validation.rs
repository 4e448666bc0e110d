// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by typed configuration structs that check themselves after
/// loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field rules. Each returns a `ValidationError` naming the field.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Minimum length in bytes.
    pub fn min_len(value: &[u8], min: usize, field: &str) -> Result<()> {
        if value.len() < min {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {} bytes (got {})",
                field,
                min,
                value.len()
            )));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {} (got {})",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be one of the allowed values",
                field
            )));
        }
        Ok(())
    }

    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL",
                field
            )));
        }
        Ok(())
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a valid port number",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_min_len() {
        assert!(ConfigValidator::min_len(&[0u8; 32], 32, "secret").is_ok());

        let err = ConfigValidator::min_len(b"short", 32, "secret").unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_in_range() {
        assert!(ConfigValidator::in_range(600, 1, 86_400, "max_age").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 86_400, "max_age").is_err());
    }

    #[test]
    fn test_one_of() {
        let allowed = ["strict", "lax", "none"];
        assert!(ConfigValidator::one_of(&"lax", &allowed, "same_site").is_ok());
        assert!(ConfigValidator::one_of(&"loose", &allowed, "same_site").is_err());
    }

    #[test]
    fn test_url_and_port() {
        assert!(ConfigValidator::is_url("https://broker.example", "base_url").is_ok());
        assert!(ConfigValidator::is_url("broker.example", "base_url").is_err());
        assert!(ConfigValidator::is_port(8080, "port").is_ok());
        assert!(ConfigValidator::is_port(0, "port").is_err());
    }
}
