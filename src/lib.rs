//! Parapet: stateless, session-bound CSRF protection for a brokerage site
//! backend, plus the client that keeps its token fresh.
//!
//! The workspace crates are re-exported under short names:
//!
//! - [`core`]: request/response model, middleware chain, router, server loop
//! - [`config`]: layered settings (file, `.env`, `PARAPET_*` environment)
//! - [`session`]: server-side sessions keyed by the `sid` cookie
//! - [`csrf`]: token authority, gating middleware and retrieval endpoint
//! - [`client`]: token cache and the secure-request wrapper with one retry
//!
//! This crate adds the demo brokerage API ([`app`]) and its process
//! configuration ([`server`]).
//!
//! ```no_run
//! use parapet::app::build_app;
//! use parapet::csrf::CsrfConfig;
//! use parapet::session::{MemorySessionStore, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let csrf = CsrfConfig::new(std::env::var("PARAPET_CSRF_SECRET")?.into_bytes())?;
//! let app = build_app(csrf, SessionConfig::default(), Arc::new(MemorySessionStore::default()))?;
//! app.listen(([127, 0, 0, 1], 3000).into()).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod forms;
pub mod server;

pub use parapet_config as config;
pub use parapet_core as core;
pub use parapet_csrf as csrf;
pub use parapet_http_client as client;
pub use parapet_session as session;

#[cfg(feature = "testing")]
pub use parapet_testing as testing;

pub use app::{CSRF_TOKEN_PATH, build_app, router};
pub use server::{AppSettings, ServerConfig, ServerError};
