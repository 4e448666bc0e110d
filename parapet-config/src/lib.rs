//! Configuration loading for Parapet services.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. an optional TOML/JSON file
//! 2. a `.env` file in the working directory
//! 3. `PARAPET_*` process environment variables
//!
//! All layers share one flat, lowercase key space with the `PARAPET_`
//! prefix removed, so `PARAPET_CSRF_MAX_AGE` and `[csrf] max_age` both set
//! `csrf_max_age`.
//!
//! ```
//! use parapet_config::Settings;
//!
//! let settings = Settings::from_pairs([("PARAPET_PORT", "8080")]);
//! assert_eq!(settings.get_parsed::<u16>("port").unwrap(), Some(8080));
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{Environment, Settings};
pub use validation::{ConfigValidator, Validate};
