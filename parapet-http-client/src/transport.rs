//! The seam between the CSRF client and the wire.

use crate::{ClientRequest, Response, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Sends a single request and returns its response. No retries, no cookie
/// handling; those belong to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ClientRequest) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ClientRequest) -> Result<Response> {
        (**self).send(request).await
    }
}
