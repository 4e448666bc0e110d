//! # Parapet HTTP Client
//!
//! Client half of the CSRF protocol: a [`Transport`] abstraction with a
//! `reqwest` implementation, and [`CsrfClient`], which caches the server's
//! CSRF token, sends it with mutating requests and retries once when the
//! server rejects a stale token.
//!
//! ```rust,no_run
//! use parapet_http_client::{ClientRequest, CsrfClient, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CsrfClient::new(HttpClient::with_base_url("https://broker.example")?);
//!
//!     let response = client
//!         .secure_request(
//!             ClientRequest::post("/api/contact")
//!                 .json(&serde_json::json!({ "name": "Ann", "email": "ann@example.com" }))?,
//!         )
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod cookie_jar;
mod csrf;
mod error;
mod request;
mod response;
mod transport;

pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use cookie_jar::CookieJar;
pub use csrf::{Attempt, CSRF_REJECTION, CsrfClient, CsrfClientConfig, is_csrf_rejection};
pub use error::{HttpClientError, Result};
pub use request::ClientRequest;
pub use response::Response;
pub use transport::Transport;
