//! Testing utilities for Parapet applications.
//!
//! - [`TestClient`] drives an [`Application`](parapet_core::Application)
//!   directly with hand-built requests.
//! - [`InProcessTransport`] plugs an application into a
//!   [`CsrfClient`](parapet_http_client::CsrfClient) so the client half can
//!   be exercised end to end without a socket.
//!
//! ```no_run
//! use parapet_core::{Application, HttpResponse, Router};
//! use parapet_testing::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new().get("/health", |_req| async { Ok(HttpResponse::ok()) });
//! let client = TestClient::new(Application::new(router));
//!
//! let response = client.get("/health").await;
//! assert_status(&response, 200);
//! # });
//! ```

pub mod assertions;
pub mod test_client;
pub mod transport;

pub use assertions::*;
pub use test_client::{TestClient, TestRequestBuilder};
pub use transport::{Exchange, InProcessTransport};
