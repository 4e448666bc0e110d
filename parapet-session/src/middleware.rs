// Session middleware

use crate::config::SessionConfig;
use crate::handle::SessionHandle;
use crate::session::Session;
use crate::store::SessionStore;
use async_trait::async_trait;
use cookie::time::Duration as CookieDuration;
use parapet_core::{Cookie, Error, HttpRequest, HttpResponse, Middleware, Next};
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads the session named by the session cookie (starting one when absent
/// or unknown), exposes it as a [`SessionHandle`] extension, and saves it
/// after the rest of the chain runs.
///
/// A session started by this request is only persisted when the response is
/// not an error, so rejected or failing requests leave nothing in the store.
pub struct SessionMiddleware<S: SessionStore> {
    store: Arc<S>,
    config: SessionConfig,
}

impl<S: SessionStore> SessionMiddleware<S> {
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load(&self, req: &HttpRequest) -> Result<SessionHandle, Error> {
        if let Some(id) = req.cookie(&self.config.cookie_name)
            && let Some(mut session) = self.store.get(&id).await?
        {
            session.touch();
            return Ok(SessionHandle::new(session, false));
        }

        Ok(SessionHandle::new(
            Session::generate(self.config.effective_ttl(None)),
            true,
        ))
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), value))
            .path(self.config.path.clone())
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(self.config.same_site)
            .build()
    }
}

#[async_trait]
impl<S: SessionStore + 'static> Middleware for SessionMiddleware<S> {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let handle = self.load(&req).await?;
        req.extensions.insert(handle.clone());

        let mut response = next(req).await?;

        if handle.is_destroyed() {
            let id = handle.id();
            self.store.delete(&id).await?;
            let mut expired = self.cookie(String::new());
            expired.set_max_age(CookieDuration::ZERO);
            response.add_cookie(&expired);
            debug!(session_id = %id, "Session destroyed");
            return Ok(response);
        }

        if handle.is_new() && response.status >= 400 {
            debug!(status = response.status, "Discarding session started by a failed request");
            return Ok(response);
        }

        if let Err(err) = self.store.save(&handle.snapshot()).await {
            warn!(error = %err, "Failed to save session");
            return Err(err.into());
        }

        if handle.is_new() {
            let mut cookie = self.cookie(handle.id());
            cookie.set_max_age(CookieDuration::seconds(
                self.config.default_ttl.as_secs() as i64,
            ));
            response.add_cookie(&cookie);
        }

        Ok(response)
    }
}
