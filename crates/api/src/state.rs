use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use relay_messaging::MessagingCore;

use crate::util::require_bearer;
use crate::ApiError;

/// Maps a bearer token to the calling user's id.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<i64>;
}

/// Accepts the numeric user id forwarded by the authenticating proxy in
/// front of this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedUserId;

#[async_trait]
impl IdentityResolver for ForwardedUserId {
    async fn resolve(&self, token: &str) -> Option<i64> {
        token.parse::<i64>().ok().filter(|user_id| *user_id > 0)
    }
}

#[derive(Clone)]
pub struct AppState {
    core: MessagingCore,
    identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(core: MessagingCore) -> Self {
        Self::with_identity(core, Arc::new(ForwardedUserId))
    }

    pub fn with_identity(core: MessagingCore, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { core, identity }
    }

    pub fn core(&self) -> &MessagingCore {
        &self.core
    }

    pub async fn authenticate(&self, token: &str) -> Result<i64, ApiError> {
        self.identity
            .resolve(token)
            .await
            .ok_or_else(|| ApiError::unauthorized("invalid bearer token"))
    }

    /// Resolve the caller from the `Authorization` header.
    pub async fn caller(&self, headers: &HeaderMap) -> Result<i64, ApiError> {
        let token = require_bearer(headers)?;
        self.authenticate(&token).await
    }
}
