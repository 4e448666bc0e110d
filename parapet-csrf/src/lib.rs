//! CSRF protection for Parapet.
//!
//! Tokens are stateless: each one carries its issue time, a random nonce and
//! the session it was issued to, signed with HMAC-SHA256. Verification needs
//! only the secret.
//!
//! ```ignore
//! use parapet_csrf::{CsrfConfig, CsrfMiddleware, csrf_token_handler};
//!
//! let csrf = CsrfMiddleware::new(CsrfConfig::from_env()?)?;
//! let router = Router::new().get("/api/csrf-token", csrf_token_handler);
//! let app = Application::new(router)
//!     .with_middleware(session_middleware)
//!     .with_middleware(csrf);
//! ```
//!
//! The session middleware must run before the CSRF middleware so tokens can
//! be bound to, and mirrored into, the session.

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod token;

pub use config::{CsrfConfig, MIN_SECRET_LEN, path_matches};
pub use error::{CsrfError, Result};
pub use handler::csrf_token_handler;
pub use middleware::{CsrfMiddleware, IssuedToken, REJECTION_ERROR, SESSION_TOKEN_KEY};
pub use token::{ANONYMOUS, Clock, CsrfToken, NONCE_LEN, SystemClock, TokenAuthority};
