// Core library for Parapet
// Request/response model, middleware chain, router and the hyper server loop

pub mod application;
pub mod error;
pub mod extensions;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod routing;

pub use application::Application;
pub use error::Error;
pub use extensions::Extensions;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Json, parse_query_string};
pub use middleware::{LoggerMiddleware, Middleware, MiddlewareChain, Next};
pub use routing::{HandlerFn, Route, Router, handler};

// Cookie types used across the workspace
pub use cookie::{Cookie, SameSite};
