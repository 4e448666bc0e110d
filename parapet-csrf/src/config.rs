use crate::error::{CsrfError, Result};
use cookie::time::Duration as CookieDuration;
use parapet_config::{ConfigValidator, Settings, Validate};
use parapet_core::{Cookie, HttpMethod, SameSite};
use std::time::Duration;
use tracing::warn;

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// CSRF protection configuration
#[derive(Clone)]
pub struct CsrfConfig {
    /// HMAC signing secret (at least [`MIN_SECRET_LEN`] bytes)
    pub secret: Vec<u8>,

    /// Maximum token age
    pub max_age: Duration,

    /// Cookie carrying the token to the browser
    pub cookie_name: String,

    /// Request header checked first
    pub header_name: String,

    /// Body fields checked after the header, in order
    pub field_names: Vec<String>,

    /// Query parameter checked last
    pub query_param: String,

    /// Exact paths, or prefixes ending in `*`, that skip verification
    pub exempt_paths: Vec<String>,

    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_secure: bool,
    /// Off so page scripts can read the token
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSite,

    /// Mint a new token after every successful verification
    pub rotate_after_verify: bool,

    /// Methods that are never verified
    pub safe_methods: Vec<HttpMethod>,
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("secret", &"<redacted>")
            .field("max_age", &self.max_age)
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .field("field_names", &self.field_names)
            .field("query_param", &self.query_param)
            .field("exempt_paths", &self.exempt_paths)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("rotate_after_verify", &self.rotate_after_verify)
            .finish_non_exhaustive()
    }
}

impl CsrfConfig {
    /// Create a configuration with the default names and policy.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(CsrfError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }

        Ok(Self {
            secret,
            max_age: Duration::from_secs(3600),
            cookie_name: "csrf-token".to_string(),
            header_name: "x-csrf-token".to_string(),
            field_names: vec!["_csrf".to_string(), "csrfToken".to_string()],
            query_param: "_csrf".to_string(),
            exempt_paths: Vec::new(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: false,
            cookie_http_only: false,
            cookie_same_site: SameSite::Strict,
            rotate_after_verify: false,
            safe_methods: vec![
                HttpMethod::GET,
                HttpMethod::HEAD,
                HttpMethod::OPTIONS,
                HttpMethod::TRACE,
            ],
        })
    }

    /// Generate a random secret
    pub fn generate_secret() -> Vec<u8> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..MIN_SECRET_LEN).map(|_| rng.r#gen()).collect()
    }

    /// Build from the `PARAPET_*` process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_settings(&Settings::from_env())
    }

    /// Build from loaded settings.
    ///
    /// Keys: `env`, `csrf_secret`, `csrf_max_age` (seconds), `csrf_rotate`,
    /// `csrf_exempt` (comma separated), `csrf_same_site`.
    ///
    /// Without `csrf_secret` a production environment is an error; any other
    /// environment gets a per-process secret.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let environment = settings.environment()?;

        let mut config = match settings.get("csrf_secret") {
            Some(secret) => Self::new(secret.as_bytes().to_vec())?,
            None if environment.is_production() => return Err(CsrfError::MissingSecret),
            None => {
                warn!(
                    environment = %environment,
                    "PARAPET_CSRF_SECRET not set, using a generated secret; tokens will not survive a restart"
                );
                Self::new(Self::generate_secret())?
            }
        };

        config.cookie_secure = environment.is_production();

        if let Some(seconds) = settings.get_parsed::<u64>("csrf_max_age")? {
            config.max_age = Duration::from_secs(seconds);
        }
        if let Some(rotate) = settings.get_bool("csrf_rotate")? {
            config.rotate_after_verify = rotate;
        }
        if let Some(paths) = settings.get_list("csrf_exempt") {
            config.exempt_paths = paths;
        }
        if let Some(same_site) = settings.get("csrf_same_site") {
            config.cookie_same_site = parse_same_site(same_site)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into().to_lowercase();
        self
    }

    pub fn with_field_names(mut self, names: Vec<String>) -> Self {
        self.field_names = names;
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = paths;
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn with_cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_after_verify = rotate;
        self
    }

    pub fn is_safe_method(&self, method: &str) -> bool {
        HttpMethod::from_str(method).is_some_and(|m| self.safe_methods.contains(&m))
    }

    /// First exempt pattern matching `path`, in list order.
    pub fn exempt_match(&self, path: &str) -> Option<&str> {
        self.exempt_paths
            .iter()
            .map(String::as_str)
            .find(|pattern| path_matches(pattern, path))
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_match(path).is_some()
    }

    /// `Set-Cookie` carrying `token`.
    pub fn token_cookie(&self, token: &str) -> Cookie<'static> {
        let mut cookie = self.base_cookie(token.to_string());
        cookie.set_max_age(CookieDuration::seconds(self.max_age.as_secs() as i64));
        cookie
    }

    /// `Set-Cookie` that deletes the token cookie.
    pub fn expire_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new());
        cookie.set_max_age(CookieDuration::ZERO);
        cookie
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.cookie_name.clone(), value))
            .path(self.cookie_path.clone())
            .secure(self.cookie_secure)
            .http_only(self.cookie_http_only)
            .same_site(self.cookie_same_site)
            .build();
        if let Some(domain) = &self.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

impl Validate for CsrfConfig {
    fn validate(&self) -> parapet_config::Result<()> {
        ConfigValidator::min_len(&self.secret, MIN_SECRET_LEN, "csrf secret")?;
        ConfigValidator::in_range(self.max_age.as_secs(), 1, 7 * 86400, "csrf max age")?;
        ConfigValidator::not_empty(&self.cookie_name, "csrf cookie name")?;
        ConfigValidator::not_empty(&self.header_name, "csrf header name")
    }
}

/// Exact match, or prefix match for patterns ending in `*`.
///
/// `/api/webhooks/*` matches `/api/webhooks`, `/api/webhooks/` and anything
/// below it, but not `/api/webhooksx`.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => {
            let base = prefix.trim_end_matches('/');
            path == base || path.starts_with(prefix)
        }
        None => pattern == path,
    }
}

fn parse_same_site(value: &str) -> Result<SameSite> {
    match value.trim().to_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        other => Err(CsrfError::Config(format!(
            "csrf_same_site must be strict, lax or none (got '{}')",
            other
        ))),
    }
}
