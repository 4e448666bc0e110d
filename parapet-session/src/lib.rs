//! Server-side sessions for Parapet applications.
//!
//! [`SessionMiddleware`] resolves the `sid` cookie to a [`Session`] held in
//! a [`SessionStore`] and hands downstream code a [`SessionHandle`] through
//! the request extensions:
//!
//! ```ignore
//! let handle = req.extensions.get::<SessionHandle>().cloned();
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod handle;
pub mod middleware;
pub mod session;
pub mod store;

pub use cleanup::SessionSweeper;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use handle::SessionHandle;
pub use middleware::SessionMiddleware;
pub use session::Session;
pub use store::{MemorySessionStore, SessionStore};
